use super::{
    fields::{write_field_getter, write_field_setter},
    methods::{write_target_call, ShapeSignature},
    AdapterContext,
};
use crate::{
    duck::{
        emit::{ForwardingRoutine, GenericArguments, LazyEmitter},
        matcher::{find_target_field, find_target_property},
    },
    error::DuckTypeError,
    types::{
        attributes::DuckKind,
        members::PropertyDescription,
        runtime::RuntimeType,
    },
};

/// Accessor routines for one shape property; `None` where the shape declares
/// no such accessor.
pub(super) struct PropertyRoutines {
    pub getter: Option<ForwardingRoutine>,
    pub setter: Option<ForwardingRoutine>,
}

pub(super) fn write_property(
    ctx: &AdapterContext<'_>,
    shape_property: PropertyDescription,
) -> Result<PropertyRoutines, DuckTypeError> {
    let duck = shape_property.property.attributes.duck_or_default();
    let name = shape_property.name();
    let shape_type = shape_property.property_type();

    if duck.kind == DuckKind::Field {
        if !shape_property.index_parameters().is_empty() {
            return Err(DuckTypeError::PropertyArgumentsLength(name.to_string()));
        }
        let field = find_target_field(ctx.target, name, &duck)?;
        let getter = match shape_property.getter() {
            Some(_) => Some(write_field_getter(ctx, field, shape_type, name)?),
            None => None,
        };
        let setter = match shape_property.setter() {
            Some(_) => Some(write_field_setter(ctx, field, shape_type, name)?),
            None => None,
        };
        return Ok(PropertyRoutines { getter, setter });
    }

    let index_types: Vec<RuntimeType> = shape_property
        .index_parameters()
        .iter()
        .map(|p| p.parameter_type.clone())
        .collect();
    let target_property = find_target_property(ctx.target, name, &index_types, &duck)?;

    let getter = match shape_property.getter() {
        None => None,
        Some(shape_getter) => {
            let target_getter = target_property
                .getter()
                .ok_or_else(|| DuckTypeError::PropertyCantBeRead(format!("{:?}", shape_property)))?;
            let mut em = LazyEmitter::new(ctx.routine_name(shape_getter.name()));
            write_target_call(
                &mut em,
                &ctx.module,
                &ShapeSignature::of(shape_getter),
                target_getter,
                GenericArguments::None,
            )?;
            Some(em.flush())
        }
    };

    let setter = match shape_property.setter() {
        None => None,
        Some(shape_setter) => {
            let target_setter = target_property.setter().ok_or_else(|| {
                DuckTypeError::PropertyCantBeWritten(format!("{:?}", shape_property))
            })?;
            if ctx.target.is_value_type() && !target_setter.is_static() {
                return Err(DuckTypeError::StructMembersCannotBeChanged(
                    ctx.target.type_name(),
                ));
            }
            let mut em = LazyEmitter::new(ctx.routine_name(shape_setter.name()));
            write_target_call(
                &mut em,
                &ctx.module,
                &ShapeSignature::of(shape_setter),
                target_setter,
                GenericArguments::None,
            )?;
            Some(em.flush())
        }
    };

    Ok(PropertyRoutines { getter, setter })
}
