use crate::types::{runtime::RuntimeType, TypeDescription};

/// Type equality and assignability over the host type model.
pub struct TypeComparer;

impl TypeComparer {
    /// Equality after enums decay to their underlying primitive.
    pub fn types_equal_decayed(a: &RuntimeType, b: &RuntimeType) -> bool {
        a == b || a.decay() == b.decay()
    }

    pub fn type_slices_equal(a: &[RuntimeType], b: &[RuntimeType]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(l, r)| l == r)
    }

    /// Whether a value of type `source` can be stored in a slot of type `target`
    /// without conversion, boxing aside.
    pub fn is_assignable_from(target: &RuntimeType, source: &RuntimeType) -> bool {
        if target == source {
            return true;
        }
        match (target, source) {
            (_, RuntimeType::Void) | (RuntimeType::Void, _) => false,
            (RuntimeType::Object, _) => true,
            (RuntimeType::MethodParameter(_), _) | (_, RuntimeType::MethodParameter(_)) => false,
            _ => Self::description_assignable(target.type_description(), source.type_description()),
        }
    }

    pub fn description_assignable(target: TypeDescription, source: TypeDescription) -> bool {
        if target == source {
            return true;
        }
        if target.is_interface() {
            return source.implements(target);
        }
        source.ancestors().any(|a| a == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemblies::AssemblyLoader;

    #[test]
    fn primitives_assign_to_object_and_value_type() {
        let loader = AssemblyLoader::global();
        assert!(TypeComparer::is_assignable_from(&RuntimeType::Object, &RuntimeType::Int32));
        assert!(TypeComparer::is_assignable_from(&RuntimeType::Int32, &RuntimeType::Int32));
        assert!(!TypeComparer::is_assignable_from(&RuntimeType::Int32, &RuntimeType::Int64));
        assert!(!TypeComparer::is_assignable_from(&RuntimeType::String, &RuntimeType::Int32));
        let value_type = loader.corlib_type("System.ValueType").unwrap();
        assert!(TypeComparer::is_assignable_from(
            &RuntimeType::Type(value_type),
            &RuntimeType::Int32
        ));
    }

    #[test]
    fn placeholders_only_match_themselves() {
        assert!(TypeComparer::is_assignable_from(
            &RuntimeType::MethodParameter(0),
            &RuntimeType::MethodParameter(0)
        ));
        assert!(!TypeComparer::is_assignable_from(
            &RuntimeType::MethodParameter(0),
            &RuntimeType::Int32
        ));
        assert!(TypeComparer::is_assignable_from(
            &RuntimeType::Object,
            &RuntimeType::MethodParameter(1)
        ));
    }
}
