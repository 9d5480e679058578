//! Data-copy shapes.
//!
//! The shape's fields are read through a transient live adapter, one getter
//! per field, and a copy routine gathers them into a new struct value.
use super::{
    fields::write_field_getter,
    methods::{write_target_call, ShapeSignature},
    AdapterContext, AdapterDefinition,
};
use crate::{
    duck::{
        emit::{
            write_safe_call, ForwardingRoutine, GenericArguments, Instruction, LazyEmitter,
            MethodTarget,
        },
        matcher::{find_target_field, find_target_property},
        proxy::ProxyType,
    },
    error::{DuckTypeError, TypeResolutionError},
    types::{attributes::DuckKind, members::FieldDescription},
    utils::sync::Arc,
};

fn write_copy_field(
    ctx: &AdapterContext<'_>,
    field: FieldDescription,
) -> Result<ForwardingRoutine, DuckTypeError> {
    let duck = field.field.attributes.duck_or_default();
    let shape_type = &field.field.field_type;
    match duck.kind {
        DuckKind::Field => {
            let target_field = find_target_field(ctx.target, field.name(), &duck)?;
            write_field_getter(ctx, target_field, shape_type, field.name())
        }
        DuckKind::Property => {
            let property = find_target_property(ctx.target, field.name(), &[], &duck)?;
            let getter = property
                .getter()
                .ok_or_else(|| DuckTypeError::PropertyCantBeRead(format!("{:?}", field)))?;
            let shape = ShapeSignature {
                name: format!("{:?}", field),
                parameters: &[],
                return_type: shape_type,
                generic_count: 0,
            };
            let mut em = LazyEmitter::new(ctx.routine_name(&format!("get_{}", field.name())));
            write_target_call(&mut em, &ctx.module, &shape, getter, GenericArguments::None)?;
            Ok(em.flush())
        }
    }
}

pub(super) fn build_copy_proxy(ctx: &AdapterContext<'_>) -> Result<ProxyType, DuckTypeError> {
    let fields: Vec<FieldDescription> = ctx
        .shape
        .declared_fields()
        .filter(|f| !f.is_static() && !f.field.attributes.ignore)
        .collect();

    let mut adapter = AdapterDefinition::new(ctx, ctx.loader.object_type(), None);
    for field in &fields {
        let routine = write_copy_field(ctx, *field)?;
        adapter = adapter.getter(field.name(), &field.field.field_type, routine);
    }
    let instance_slot = adapter.instance_slot;
    let description = adapter.define()?;

    let mut em = LazyEmitter::new(ctx.routine_name("<copy>"));
    em.emit(Instruction::NewStruct(ctx.shape));
    for field in &fields {
        let getter = description
            .property_named(field.name())
            .and_then(|p| p.getter())
            .ok_or_else(|| {
                TypeResolutionError::PropertyNotFound(format!(
                    "{}::{}",
                    description.type_name(),
                    field.name()
                ))
            })?;
        em.emit(Instruction::LoadInstance);
        write_safe_call(
            &mut em,
            &ctx.module,
            MethodTarget(getter).into(),
            0,
            true,
            GenericArguments::None,
        );
        em.emit(Instruction::StoreStructField(field.field.slot));
    }
    em.emit(Instruction::Return);

    Ok(ProxyType {
        description,
        shape: ctx.shape,
        target: ctx.target,
        module: ctx.module.clone(),
        instance_slot,
        copy: Some(Arc::new(em.flush())),
    })
}
