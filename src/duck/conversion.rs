//! Conversion planning between shape-side and target-side slot types.
use crate::{
    duck::{
        cache::CreateCache,
        emit::{Instruction, LazyEmitter},
    },
    error::DuckTypeError,
    types::{comparer::TypeComparer, runtime::RuntimeType},
};
use std::sync::Arc;

/// Whether a value of `target_side` type must be re-adapted to reach a slot of
/// `shape_side` type.
pub fn needs_duck_chaining(target_side: &RuntimeType, shape_side: &RuntimeType) -> bool {
    if let RuntimeType::Type(td) = shape_side {
        if td.is_duck_copy() {
            return true;
        }
    }
    shape_side != target_side
        && !shape_side.is_value_type()
        && !shape_side.is_generic_parameter()
        && !TypeComparer::is_assignable_from(shape_side, target_side)
        && !shape_side.is_core_type()
}

/// Emits the conversion of the value on top of the stack from `actual` to `expected`.
pub fn write_type_conversion(
    em: &mut LazyEmitter,
    actual: &RuntimeType,
    expected: &RuntimeType,
) -> Result<(), DuckTypeError> {
    let invalid = || DuckTypeError::InvalidTypeConversion {
        actual: actual.full_name(),
        expected: expected.full_name(),
    };

    if TypeComparer::types_equal_decayed(actual, expected) {
        return Ok(());
    }
    if actual.is_void() || expected.is_void() {
        return Err(invalid());
    }

    match (actual.is_value_type(), expected.is_value_type()) {
        (true, false) => {
            em.emit(Instruction::Box(actual.clone()));
            if *expected != RuntimeType::Object && !expected.is_generic_parameter() {
                if !TypeComparer::is_assignable_from(expected, actual) {
                    return Err(invalid());
                }
                em.emit(Instruction::CastClass(expected.clone()));
            }
        }
        (false, true) => em.emit(Instruction::UnboxAny(expected.clone())),
        (true, true) => return Err(invalid()),
        (false, false) => {
            if !TypeComparer::is_assignable_from(expected, actual) {
                em.emit(Instruction::CastClass(expected.clone()));
            }
        }
    }
    Ok(())
}

/// Plans a value flowing from the shape into the target (arguments, setter values).
pub fn write_shape_to_target(
    em: &mut LazyEmitter,
    shape_side: &RuntimeType,
    target_side: &RuntimeType,
) -> Result<(), DuckTypeError> {
    if needs_duck_chaining(target_side, shape_side) {
        em.emit(Instruction::ExtractInstance);
        write_type_conversion(em, &RuntimeType::Object, target_side)
    } else {
        write_type_conversion(em, shape_side, target_side)
    }
}

/// Plans a value flowing from the target back to the shape (returns, reads,
/// by-ref copy-back).
pub fn write_target_to_shape(
    em: &mut LazyEmitter,
    target_side: &RuntimeType,
    shape_side: &RuntimeType,
) -> Result<(), DuckTypeError> {
    match shape_side {
        RuntimeType::Type(shape) if needs_duck_chaining(target_side, shape_side) => {
            if target_side.is_value_type() {
                em.emit(Instruction::Box(target_side.clone()));
            }
            em.emit(Instruction::Chain(Arc::new(CreateCache::new(*shape))));
            Ok(())
        }
        _ => write_type_conversion(em, target_side, shape_side),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assemblies::AssemblyLoader,
        types::builder::{MethodBuilder, TypeBuilder},
    };

    fn listing(em: LazyEmitter) -> Vec<String> {
        em.flush().instructions.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn identical_and_enum_types_need_nothing() {
        let asm = AssemblyLoader::global().load_assembly("Conversion.Tests");
        let color = TypeBuilder::enumeration(asm, "Conversion.Tests.Color", RuntimeType::Int32)
            .build()
            .unwrap();
        let mut em = LazyEmitter::new("enum");
        write_type_conversion(&mut em, &RuntimeType::Type(color), &RuntimeType::Int32).unwrap();
        write_type_conversion(&mut em, &RuntimeType::String, &RuntimeType::String).unwrap();
        assert!(em.is_empty());
    }

    #[test]
    fn value_to_reference_boxes() {
        let mut em = LazyEmitter::new("box");
        write_type_conversion(&mut em, &RuntimeType::Int32, &RuntimeType::Object).unwrap();
        assert_eq!(listing(em), vec!["box System.Int32"]);

        let mut em = LazyEmitter::new("unbox");
        write_type_conversion(&mut em, &RuntimeType::Object, &RuntimeType::Int64).unwrap();
        assert_eq!(listing(em), vec!["unbox.any System.Int64"]);
    }

    #[test]
    fn unrelated_value_types_fail_at_generation() {
        let mut em = LazyEmitter::new("bad");
        let err = write_type_conversion(&mut em, &RuntimeType::Int32, &RuntimeType::String).unwrap_err();
        assert_eq!(
            err,
            DuckTypeError::InvalidTypeConversion {
                actual: "System.Int32".to_string(),
                expected: "System.String".to_string(),
            }
        );
        assert!(write_type_conversion(&mut em, &RuntimeType::Int32, &RuntimeType::Int64).is_err());
    }

    #[test]
    fn chaining_applies_to_unrelated_user_shapes_only() {
        let asm = AssemblyLoader::global().load_assembly("Conversion.Tests.Chain");
        let shape = TypeBuilder::interface(asm, "Conversion.Tests.Chain.IName")
            .method(MethodBuilder::new("Name").returns(RuntimeType::String))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Conversion.Tests.Chain.Person").build().unwrap();
        let implementor = TypeBuilder::class(asm, "Conversion.Tests.Chain.Named")
            .implements(shape)
            .method(
                MethodBuilder::new("Name")
                    .returns(RuntimeType::String)
                    .body(|_| Ok("n".into())),
            )
            .build()
            .unwrap();

        let shape_ty = RuntimeType::Type(shape);
        assert!(needs_duck_chaining(&RuntimeType::Type(target), &shape_ty));
        assert!(needs_duck_chaining(&RuntimeType::Object, &shape_ty));
        assert!(!needs_duck_chaining(&RuntimeType::Type(implementor), &shape_ty));
        assert!(!needs_duck_chaining(&RuntimeType::Type(target), &RuntimeType::Object));
        assert!(!needs_duck_chaining(&RuntimeType::Int32, &RuntimeType::Int64));

        let mut em = LazyEmitter::new("chain");
        write_target_to_shape(&mut em, &RuntimeType::Type(target), &shape_ty).unwrap();
        write_shape_to_target(&mut em, &shape_ty, &RuntimeType::Type(target)).unwrap();
        assert_eq!(
            listing(em),
            vec![
                "duckchain Conversion.Tests.Chain.IName",
                "ldduckinst",
                "castclass Conversion.Tests.Chain.Person",
            ]
        );
    }
}
