//! Resolution of shape members onto target members.
use crate::{
    assemblies::AssemblyLoader,
    error::DuckTypeError,
    types::{
        attributes::DuckAttribute,
        members::{FieldDescription, MethodDescription, PropertyDescription},
        runtime::RuntimeType,
        TypeDescription,
    },
};
use tracing::trace;

fn not_found(shape_method: &MethodDescription, target: TypeDescription) -> DuckTypeError {
    DuckTypeError::TargetMethodNotFound {
        proxy: format!("{:?}", shape_method),
        target: target.type_name(),
    }
}

/// Whether `candidate`'s reverse-method argument list names the shape parameters.
fn reverse_matches(candidate: &MethodDescription, shape_types: &[RuntimeType]) -> bool {
    match &candidate.method.attributes.reverse_arguments {
        Some(names) => {
            names.len() == shape_types.len()
                && names.iter().zip(shape_types).all(|(n, t)| t.matches_name(n))
        }
        None => false,
    }
}

/// Structural compatibility of one candidate with the shape method.
fn structurally_compatible(candidate: &MethodDescription, shape_method: &MethodDescription) -> bool {
    let shape_params = shape_method.parameters();
    let target_params = candidate.parameters();

    if shape_params.len() > target_params.len() {
        return false;
    }
    if target_params[shape_params.len()..]
        .iter()
        .any(|p| !p.is_optional())
    {
        return false;
    }

    shape_params.iter().zip(target_params).all(|(shape, target)| {
        if shape.kind != target.kind {
            return false;
        }
        let shape_ty = &shape.parameter_type;
        if shape_ty.is_generic_parameter() {
            return true;
        }
        if shape_ty.is_value_type() {
            return *shape_ty == target.parameter_type;
        }
        if shape_ty.is_open_reference() {
            return true;
        }
        crate::types::comparer::TypeComparer::is_assignable_from(&target.parameter_type, shape_ty)
    })
}

/// Finds the target method a shape method forwards to.
pub fn find_target_method(
    loader: &AssemblyLoader,
    target: TypeDescription,
    shape_method: MethodDescription,
    duck: &DuckAttribute,
) -> Result<MethodDescription, DuckTypeError> {
    let flags = duck.binding_flags;
    let shape_types: Vec<RuntimeType> = shape_method
        .parameters()
        .iter()
        .map(|p| p.parameter_type.clone())
        .collect();

    for name in duck.candidate_names(shape_method.name()) {
        if let Some(explicit) = &duck.parameter_type_names {
            let types = explicit
                .iter()
                .map(|n| loader.find_type(n))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    trace!("explicit parameter type for {:?} not resolved: {}", shape_method, e);
                    not_found(&shape_method, target)
                })?;
            match target.find_method(&name, flags, &types) {
                Some(m) => return Ok(m),
                None => continue,
            }
        }

        let exact = target.methods(flags).into_iter().find(|m| {
            m.name() == name
                && m.parameters().len() == shape_method.parameters().len()
                && m.parameters()
                    .iter()
                    .zip(shape_method.parameters())
                    .all(|(t, s)| t.parameter_type == s.parameter_type && t.kind == s.kind)
        });
        if let Some(m) = exact {
            return Ok(m);
        }

        let mut found: Option<MethodDescription> = None;
        for candidate in target.methods(flags) {
            if candidate.name() != name {
                continue;
            }
            if reverse_matches(&candidate, &shape_types) {
                return Ok(candidate);
            }
            if !structurally_compatible(&candidate, &shape_method) {
                continue;
            }
            if let Some(first) = found {
                return Err(DuckTypeError::TargetMethodAmbiguousMatch {
                    proxy: format!("{:?}", shape_method),
                    first: format!("{:?}", first),
                    second: format!("{:?}", candidate),
                });
            }
            found = Some(candidate);
        }
        if let Some(m) = found {
            return Ok(m);
        }
    }

    Err(not_found(&shape_method, target))
}

/// Finds the target property behind a shape member with the given index
/// parameter types (empty for plain properties).
pub fn find_target_property(
    target: TypeDescription,
    member_name: &str,
    index_types: &[RuntimeType],
    duck: &DuckAttribute,
) -> Result<PropertyDescription, DuckTypeError> {
    for name in duck.candidate_names(member_name) {
        let found = if index_types.is_empty() {
            target.find_property(&name, duck.binding_flags, None)
        } else {
            target
                .find_property(&name, duck.binding_flags, Some(index_types))
                .or_else(|| target.find_property(&name, duck.binding_flags, None))
        };
        if let Some(property) = found {
            if property.index_parameters().len() != index_types.len() {
                return Err(DuckTypeError::PropertyArgumentsLength(member_name.to_string()));
            }
            return Ok(property);
        }
    }

    Err(DuckTypeError::PropertyOrFieldNotFound {
        member: member_name.to_string(),
        target: target.type_name(),
    })
}

/// Finds the target field a shape member maps to.
pub fn find_target_field(
    target: TypeDescription,
    member_name: &str,
    duck: &DuckAttribute,
) -> Result<FieldDescription, DuckTypeError> {
    duck.candidate_names(member_name)
        .iter()
        .find_map(|name| target.find_field(name, duck.binding_flags))
        .ok_or_else(|| DuckTypeError::PropertyOrFieldNotFound {
            member: member_name.to_string(),
            target: target.type_name(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::builder::{MethodBuilder, TypeBuilder},
        value::Value,
    };

    fn assembly(name: &str) -> &'static crate::assemblies::Assembly {
        AssemblyLoader::global().load_assembly(name)
    }

    fn shape_method(shape: TypeDescription, name: &str) -> MethodDescription {
        shape
            .declared_methods()
            .find(|m| m.name() == name)
            .unwrap()
    }

    fn noop() -> impl Fn(&mut crate::types::members::CallContext<'_>) -> Result<Value, crate::error::RuntimeError> + Send + Sync + 'static {
        |_| Ok(Value::Null)
    }

    #[test]
    fn exact_match_wins_over_structural() {
        let asm = assembly("Matcher.Tests.Exact");
        let shape = TypeBuilder::interface(asm, "Matcher.Tests.Exact.IShape")
            .method(MethodBuilder::new("Run").param("o", RuntimeType::Object))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Matcher.Tests.Exact.Target")
            .method(MethodBuilder::new("Run").param("o", RuntimeType::Object).body(noop()))
            .method(MethodBuilder::new("Run").param("s", RuntimeType::String).body(noop()))
            .build()
            .unwrap();

        let found = find_target_method(
            AssemblyLoader::global(),
            target,
            shape_method(shape, "Run"),
            &DuckAttribute::default(),
        )
        .unwrap();
        assert_eq!(found.parameters()[0].parameter_type, RuntimeType::Object);
    }

    #[test]
    fn parameter_kinds_must_agree() {
        let asm = assembly("Matcher.Tests.Kinds");
        let shape = TypeBuilder::interface(asm, "Matcher.Tests.Kinds.IShape")
            .method(MethodBuilder::new("Get").out_param("v", RuntimeType::Int32))
            .method(MethodBuilder::new("Put").ref_param("v", RuntimeType::Object))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Matcher.Tests.Kinds.Target")
            .method(MethodBuilder::new("Get").ref_param("v", RuntimeType::Int32).body(noop()))
            .method(MethodBuilder::new("Get").out_param("v", RuntimeType::Int32).body(noop()))
            .method(MethodBuilder::new("Put").in_param("v", RuntimeType::String).body(noop()))
            .build()
            .unwrap();

        let found = find_target_method(
            AssemblyLoader::global(),
            target,
            shape_method(shape, "Get"),
            &DuckAttribute::default(),
        )
        .unwrap();
        assert!(found.parameters()[0].kind.is_out());

        let err = find_target_method(
            AssemblyLoader::global(),
            target,
            shape_method(shape, "Put"),
            &DuckAttribute::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DuckTypeError::TargetMethodNotFound { .. }));
    }

    #[test]
    fn structural_ambiguity_is_an_error() {
        let asm = assembly("Matcher.Tests.Ambiguous");
        let shape = TypeBuilder::interface(asm, "Matcher.Tests.Ambiguous.IShape")
            .method(MethodBuilder::new("Add").param("item", RuntimeType::Object))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Matcher.Tests.Ambiguous.Target")
            .method(MethodBuilder::new("Add").param("s", RuntimeType::String).body(noop()))
            .method(MethodBuilder::new("Add").param("i", RuntimeType::Int32).private().body(noop()))
            .method(MethodBuilder::new("Add").param("b", RuntimeType::Boolean).body(noop()))
            .build()
            .unwrap();

        let err = find_target_method(
            AssemblyLoader::global(),
            target,
            shape_method(shape, "Add"),
            &DuckAttribute::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DuckTypeError::TargetMethodAmbiguousMatch { .. }));
    }

    #[test]
    fn optional_trailing_parameters_are_compatible() {
        let asm = assembly("Matcher.Tests.Optional");
        let shape = TypeBuilder::interface(asm, "Matcher.Tests.Optional.IShape")
            .method(MethodBuilder::new("Log").param("message", RuntimeType::String))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Matcher.Tests.Optional.Target")
            .method(
                MethodBuilder::new("Log")
                    .param("message", RuntimeType::String)
                    .optional_param("level", RuntimeType::Int32, 2)
                    .body(noop()),
            )
            .method(
                MethodBuilder::new("Log")
                    .param("message", RuntimeType::String)
                    .param("category", RuntimeType::String)
                    .body(noop()),
            )
            .build()
            .unwrap();

        let found = find_target_method(
            AssemblyLoader::global(),
            target,
            shape_method(shape, "Log"),
            &DuckAttribute::default(),
        )
        .unwrap();
        assert_eq!(found.parameters().len(), 2);
        assert!(found.parameters()[1].is_optional());
    }

    #[test]
    fn explicit_parameter_types_select_the_overload() {
        let asm = assembly("Matcher.Tests.Explicit");
        let shape = TypeBuilder::interface(asm, "Matcher.Tests.Explicit.IShape")
            .method(
                MethodBuilder::new("Put")
                    .param("value", RuntimeType::Object)
                    .duck(DuckAttribute::named("Set").parameter_types(["System.Int64"])),
            )
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Matcher.Tests.Explicit.Target")
            .method(MethodBuilder::new("Set").param("v", RuntimeType::Int32).body(noop()))
            .method(MethodBuilder::new("Set").param("v", RuntimeType::Int64).body(noop()))
            .build()
            .unwrap();

        let put = shape_method(shape, "Put");
        let duck = put.method.attributes.duck_or_default();
        let found = find_target_method(AssemblyLoader::global(), target, put, &duck).unwrap();
        assert_eq!(found.parameters()[0].parameter_type, RuntimeType::Int64);

        let missing = DuckAttribute::named("Set").parameter_types(["Nope.Missing"]);
        assert!(matches!(
            find_target_method(AssemblyLoader::global(), target, put, &missing),
            Err(DuckTypeError::TargetMethodNotFound { .. })
        ));
    }

    #[test]
    fn reverse_arguments_short_circuit() {
        let asm = assembly("Matcher.Tests.Reverse");
        let shape = TypeBuilder::interface(asm, "Matcher.Tests.Reverse.IShape")
            .method(MethodBuilder::new("OnEvent").param("payload", RuntimeType::Object))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Matcher.Tests.Reverse.Target")
            .method(MethodBuilder::new("OnEvent").param("s", RuntimeType::String).body(noop()))
            .method(
                MethodBuilder::new("OnEvent")
                    .param("i", RuntimeType::Int32)
                    .reverse(["Object"])
                    .body(noop()),
            )
            .build()
            .unwrap();

        let found = find_target_method(
            AssemblyLoader::global(),
            target,
            shape_method(shape, "OnEvent"),
            &DuckAttribute::default(),
        )
        .unwrap();
        assert_eq!(found.parameters()[0].parameter_type, RuntimeType::Int32);
    }

    #[test]
    fn alternative_names_are_tried_in_order() {
        let asm = assembly("Matcher.Tests.Names");
        let target = TypeBuilder::class(asm, "Matcher.Tests.Names.Target")
            .field(crate::types::builder::FieldBuilder::new("_count", RuntimeType::Int32).private())
            .build()
            .unwrap();
        let duck = DuckAttribute::named("count, _count").field();
        let field = find_target_field(target, "Count", &duck).unwrap();
        assert_eq!(field.name(), "_count");

        let err = find_target_field(target, "Total", &DuckAttribute::default()).unwrap_err();
        assert_eq!(
            err,
            DuckTypeError::PropertyOrFieldNotFound {
                member: "Total".to_string(),
                target: "Matcher.Tests.Names.Target".to_string(),
            }
        );
    }

    #[test]
    fn indexer_arity_must_match() {
        let asm = assembly("Matcher.Tests.Indexer");
        let target = TypeBuilder::class(asm, "Matcher.Tests.Indexer.Table")
            .property(
                crate::types::builder::PropertyBuilder::indexer(RuntimeType::String)
                    .index("row", RuntimeType::Int32)
                    .index("column", RuntimeType::Int32)
                    .get(|_| Ok(Value::from("cell"))),
            )
            .property(
                crate::types::builder::PropertyBuilder::new("Name", RuntimeType::String)
                    .get(|_| Ok(Value::from("table"))),
            )
            .build()
            .unwrap();

        let duck = DuckAttribute::default();
        let found = find_target_property(
            target,
            "Item",
            &[RuntimeType::Int32, RuntimeType::Int32],
            &duck,
        )
        .unwrap();
        assert_eq!(found.index_parameters().len(), 2);

        assert_eq!(
            find_target_property(target, "Item", &[RuntimeType::Int32], &duck).unwrap_err(),
            DuckTypeError::PropertyArgumentsLength("Item".to_string())
        );
        assert!(find_target_property(target, "Name", &[], &duck).is_ok());
        assert!(matches!(
            find_target_property(target, "Title", &[], &duck),
            Err(DuckTypeError::PropertyOrFieldNotFound { .. })
        ));
    }
}
