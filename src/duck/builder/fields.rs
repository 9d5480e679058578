use super::AdapterContext;
use crate::{
    duck::{
        conversion::{write_shape_to_target, write_target_to_shape},
        emit::{
            write_safe_call, FieldGetter, FieldSetter, ForwardingRoutine, GenericArguments,
            Instruction, LazyEmitter,
        },
    },
    error::DuckTypeError,
    types::{members::FieldDescription, runtime::RuntimeType},
};

pub(super) fn write_field_getter(
    ctx: &AdapterContext<'_>,
    field: FieldDescription,
    shape_type: &RuntimeType,
    member: &str,
) -> Result<ForwardingRoutine, DuckTypeError> {
    let mut em = LazyEmitter::new(ctx.routine_name(&format!("get_{}", member)));
    if !field.is_static() {
        em.emit(Instruction::LoadInstance);
    }
    write_safe_call(
        &mut em,
        &ctx.module,
        FieldGetter(field).into(),
        0,
        true,
        GenericArguments::None,
    );
    write_target_to_shape(&mut em, &field.field.field_type, shape_type)?;
    em.emit(Instruction::Return);
    Ok(em.flush())
}

pub(super) fn write_field_setter(
    ctx: &AdapterContext<'_>,
    field: FieldDescription,
    shape_type: &RuntimeType,
    member: &str,
) -> Result<ForwardingRoutine, DuckTypeError> {
    if field.field.is_read_only {
        return Err(DuckTypeError::FieldIsReadonly(format!("{:?}", field)));
    }
    if ctx.target.is_value_type() && !field.is_static() {
        return Err(DuckTypeError::StructMembersCannotBeChanged(
            ctx.target.type_name(),
        ));
    }

    let mut em = LazyEmitter::new(ctx.routine_name(&format!("set_{}", member)));
    if !field.is_static() {
        em.emit(Instruction::LoadInstance);
    }
    em.emit(Instruction::LoadArgument(0));
    write_shape_to_target(&mut em, shape_type, &field.field.field_type)?;
    write_safe_call(
        &mut em,
        &ctx.module,
        FieldSetter(field).into(),
        1,
        false,
        GenericArguments::None,
    );
    em.emit(Instruction::Return);
    Ok(em.flush())
}
