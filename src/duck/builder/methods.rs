use super::AdapterContext;
use crate::{
    assemblies::AssemblyLoader,
    duck::{
        conversion::{write_shape_to_target, write_target_to_shape},
        emit::{
            write_safe_call, ForwardingRoutine, GenericArguments, Instruction, Invocable,
            LazyEmitter, MethodTarget, TargetMember,
        },
        matcher::find_target_method,
        module::ModuleBuilder,
    },
    error::DuckTypeError,
    types::{
        attributes::DuckAttribute,
        members::{MethodDescription, ParameterDefinition, ParameterKind},
        runtime::RuntimeType,
    },
    utils::sync::Arc,
};

/// The shape side of a forwarded call.
pub(super) struct ShapeSignature<'a> {
    /// Rendering of the shape member, for errors.
    pub name: String,
    pub parameters: &'a [ParameterDefinition],
    pub return_type: &'a RuntimeType,
    pub generic_count: usize,
}

impl ShapeSignature<'static> {
    pub fn of(method: MethodDescription) -> Self {
        Self {
            name: format!("{:?}", method),
            parameters: method.parameters(),
            return_type: method.return_type(),
            generic_count: method.method.generic_parameters.len(),
        }
    }
}

/// Generic arguments for calling `target_method` on behalf of `shape`.
pub(super) fn target_generics(
    loader: &AssemblyLoader,
    shape: &ShapeSignature<'_>,
    target_method: MethodDescription,
    duck: &DuckAttribute,
) -> Result<GenericArguments, DuckTypeError> {
    let arity = target_method.method.generic_parameters.len();
    if arity == 0 {
        return Ok(GenericArguments::None);
    }
    match &duck.generic_parameter_type_names {
        Some(names) if names.len() == arity => {
            let types = names
                .iter()
                .map(|n| loader.find_type(n))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(GenericArguments::Closed(types.into()))
        }
        None if shape.generic_count == arity => Ok(GenericArguments::Forwarded),
        _ => Err(DuckTypeError::TargetMethodGenericArgumentsMissing(format!(
            "{:?}",
            target_method
        ))),
    }
}

/// Emits the whole body forwarding `shape` to `target_method`: argument
/// conversions, by-ref temporaries, the call, the return conversion and the
/// copy-back of by-ref temporaries.
pub(super) fn write_target_call(
    em: &mut LazyEmitter,
    module: &ModuleBuilder,
    shape: &ShapeSignature<'_>,
    target_method: MethodDescription,
    generics: GenericArguments,
) -> Result<(), DuckTypeError> {
    let mismatch = |reason: String| DuckTypeError::ParameterSignatureMismatch {
        proxy: shape.name.clone(),
        target: format!("{:?}", target_method),
        reason,
    };

    let target_parameters = target_method.parameters();
    if shape.parameters.len() > target_parameters.len() {
        return Err(mismatch(format!(
            "{} arguments supplied, the target takes {}",
            shape.parameters.len(),
            target_parameters.len()
        )));
    }
    if !shape.return_type.is_void() && target_method.return_type().is_void() {
        return Err(DuckTypeError::ReturnTypeMismatch {
            proxy: shape.name.clone(),
            target: format!("{:?}", target_method),
        });
    }

    let target: TargetMember = MethodTarget(target_method).into();
    module.ensure_type_visibility(target.declaring_type());
    if shape.generic_count > 0 && !module.can_call_directly(&target) {
        return Err(DuckTypeError::GenericMethodNotSupportedInNonPublicInstance(
            shape.name.clone(),
        ));
    }

    let closed: Arc<[RuntimeType]> = match &generics {
        GenericArguments::Closed(types) => types.clone(),
        _ => Arc::from(Vec::new()),
    };

    if !target_method.is_static() {
        em.emit(Instruction::LoadInstance);
    }

    let mut setup = 0;
    let mut copy_back = vec![];
    for (i, target_parameter) in target_parameters.iter().enumerate() {
        let target_type = target_parameter.parameter_type.substitute(&closed);
        let Some(shape_parameter) = shape.parameters.get(i) else {
            match &target_parameter.default {
                Some(default) if !target_parameter.kind.is_by_ref() => {
                    em.emit(Instruction::LoadConstant(default.clone()));
                    continue;
                }
                _ => {
                    return Err(DuckTypeError::ProxyMethodParameterIsMissing {
                        proxy: shape.name.clone(),
                        target: format!("{:?}", target_method),
                        parameter: target_parameter.name.clone(),
                    })
                }
            }
        };

        if shape_parameter.kind != target_parameter.kind {
            return Err(mismatch(format!(
                "parameter '{}' is passed differently",
                shape_parameter.name
            )));
        }

        let index = i as u16;
        let shape_type = &shape_parameter.parameter_type;
        if !target_parameter.kind.is_by_ref() {
            em.emit(Instruction::LoadArgument(index));
            write_shape_to_target(em, shape_type, &target_type)?;
            continue;
        }
        if *shape_type == target_type {
            em.emit(Instruction::LoadArgumentAddress(index));
            continue;
        }

        // The target writes through a temporary of its own element type.
        let local = em.declare_local(target_type.clone());
        if !target_parameter.kind.is_out() {
            em.set_offset(setup);
            em.emit(Instruction::LoadArgument(index));
            write_shape_to_target(em, shape_type, &target_type)?;
            em.emit(Instruction::StoreLocal(local));
            setup = em.offset().unwrap_or(setup);
            em.reset_offset();
        }
        em.emit(Instruction::LoadLocalAddress(local));
        if target_parameter.kind != ParameterKind::In {
            copy_back.push((index, local, target_type, shape_type.clone()));
        }
    }

    let target_return = target_method.return_type().substitute(&closed);
    write_safe_call(
        em,
        module,
        target,
        target_parameters.len(),
        !target_return.is_void(),
        generics,
    );
    if !target_return.is_void() {
        if shape.return_type.is_void() {
            em.emit(Instruction::Pop);
        } else {
            write_target_to_shape(em, &target_return, shape.return_type)?;
        }
    }

    for (index, local, target_type, shape_type) in copy_back {
        em.emit(Instruction::LoadLocal(local));
        write_target_to_shape(em, &target_type, &shape_type)?;
        em.emit(Instruction::StoreArgument(index));
    }
    em.emit(Instruction::Return);
    Ok(())
}

pub(super) fn write_method(
    ctx: &AdapterContext<'_>,
    shape_method: MethodDescription,
) -> Result<ForwardingRoutine, DuckTypeError> {
    let duck = shape_method.method.attributes.duck_or_default();
    let target_method = find_target_method(ctx.loader, ctx.target, shape_method, &duck)?;
    let shape = ShapeSignature::of(shape_method);
    let generics = target_generics(ctx.loader, &shape, target_method, &duck)?;

    let mut em = LazyEmitter::new(ctx.routine_name(shape_method.name()));
    write_target_call(&mut em, &ctx.module, &shape, target_method, generics)?;
    Ok(em.flush())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        duck::{metrics::DuckMetrics, module::ModuleRegistry},
        types::{
            attributes::BindingFlags,
            builder::{MethodBuilder, TypeBuilder},
            TypeDescription,
        },
        value::Value,
    };

    fn listing(em: LazyEmitter) -> Vec<String> {
        em.flush().instructions.iter().map(|i| i.to_string()).collect()
    }

    fn module_for(target: TypeDescription) -> Arc<ModuleBuilder> {
        ModuleRegistry::new(Arc::new(DuckMetrics::default()))
            .module_for(AssemblyLoader::global(), target)
            .unwrap()
    }

    fn method(td: TypeDescription, name: &str) -> MethodDescription {
        td.methods(BindingFlags::DEFAULT)
            .into_iter()
            .find(|m| m.name() == name)
            .unwrap()
    }

    #[test]
    fn by_ref_temporaries_are_set_up_before_the_instance_load() {
        let asm = AssemblyLoader::global().load_assembly("Methods.Tests.ByRef");
        let shape = TypeBuilder::interface(asm, "Methods.Tests.ByRef.IShape")
            .method(MethodBuilder::new("Bump").ref_param("value", RuntimeType::Object))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Methods.Tests.ByRef.Target")
            .method(
                MethodBuilder::new("Bump")
                    .ref_param("value", RuntimeType::Int32)
                    .body(|_| Ok(Value::Null)),
            )
            .build()
            .unwrap();

        let mut em = LazyEmitter::new("bump");
        write_target_call(
            &mut em,
            &module_for(target),
            &ShapeSignature::of(method(shape, "Bump")),
            method(target, "Bump"),
            GenericArguments::None,
        )
        .unwrap();
        assert_eq!(
            listing(em),
            vec![
                "ldarg.0",
                "unbox.any System.Int32",
                "stloc.0",
                "ldinst",
                "ldloca.0",
                "call Void Methods.Tests.ByRef.Target::Bump(ref Int32)",
                "ldloc.0",
                "box System.Int32",
                "starg.0",
                "ret",
            ]
        );
    }

    #[test]
    fn missing_optional_arguments_use_defaults() {
        let asm = AssemblyLoader::global().load_assembly("Methods.Tests.Optional");
        let shape = TypeBuilder::interface(asm, "Methods.Tests.Optional.IShape")
            .method(MethodBuilder::new("Log").param("message", RuntimeType::String))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Methods.Tests.Optional.Target")
            .method(
                MethodBuilder::new("Log")
                    .param("message", RuntimeType::String)
                    .optional_param("level", RuntimeType::Int32, 3)
                    .returns(RuntimeType::Boolean)
                    .body(|_| Ok(Value::Boolean(true))),
            )
            .method(
                MethodBuilder::new("Write")
                    .param("message", RuntimeType::String)
                    .param("level", RuntimeType::Int32)
                    .body(|_| Ok(Value::Null)),
            )
            .build()
            .unwrap();
        let module = module_for(target);
        let shape_log = ShapeSignature::of(method(shape, "Log"));

        let mut em = LazyEmitter::new("log");
        write_target_call(&mut em, &module, &shape_log, method(target, "Log"), GenericArguments::None)
            .unwrap();
        assert_eq!(
            listing(em),
            vec![
                "ldinst",
                "ldarg.0",
                "ldc Int32(3)",
                "call Boolean Methods.Tests.Optional.Target::Log(String, Int32)",
                "pop",
                "ret",
            ]
        );

        let mut em = LazyEmitter::new("write");
        let err = write_target_call(
            &mut em,
            &module,
            &shape_log,
            method(target, "Write"),
            GenericArguments::None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DuckTypeError::ProxyMethodParameterIsMissing { ref parameter, .. } if parameter == "level"
        ));
    }

    #[test]
    fn void_targets_cannot_feed_a_return_value() {
        let asm = AssemblyLoader::global().load_assembly("Methods.Tests.Return");
        let shape = TypeBuilder::interface(asm, "Methods.Tests.Return.IShape")
            .method(MethodBuilder::new("Run").returns(RuntimeType::Int32))
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Methods.Tests.Return.Target")
            .method(MethodBuilder::new("Run").body(|_| Ok(Value::Null)))
            .build()
            .unwrap();

        let mut em = LazyEmitter::new("run");
        let err = write_target_call(
            &mut em,
            &module_for(target),
            &ShapeSignature::of(method(shape, "Run")),
            method(target, "Run"),
            GenericArguments::None,
        )
        .unwrap_err();
        assert!(matches!(err, DuckTypeError::ReturnTypeMismatch { .. }));
    }

    #[test]
    fn generic_targets_need_closing_types() {
        let asm = AssemblyLoader::global().load_assembly("Methods.Tests.Generic");
        let shape = TypeBuilder::interface(asm, "Methods.Tests.Generic.IShape")
            .method(
                MethodBuilder::new("Echo")
                    .param("value", RuntimeType::Object)
                    .returns(RuntimeType::Object),
            )
            .method(
                MethodBuilder::new("Same")
                    .generic(["T"])
                    .param("value", RuntimeType::MethodParameter(0))
                    .returns(RuntimeType::MethodParameter(0)),
            )
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Methods.Tests.Generic.Target")
            .method(
                MethodBuilder::new("Echo")
                    .generic(["T"])
                    .param("value", RuntimeType::MethodParameter(0))
                    .returns(RuntimeType::MethodParameter(0))
                    .body(|ctx| ctx.arg(0)),
            )
            .build()
            .unwrap();
        let loader = AssemblyLoader::global();
        let echo = method(target, "Echo");

        let implicit = ShapeSignature::of(method(shape, "Echo"));
        assert!(matches!(
            target_generics(loader, &implicit, echo, &DuckAttribute::default()),
            Err(DuckTypeError::TargetMethodGenericArgumentsMissing(_))
        ));

        let closing = DuckAttribute::default().generic_arguments(["System.Int32"]);
        assert_eq!(
            target_generics(loader, &implicit, echo, &closing).unwrap(),
            GenericArguments::Closed(Arc::from(vec![RuntimeType::Int32]))
        );

        let same = ShapeSignature::of(method(shape, "Same"));
        assert_eq!(
            target_generics(loader, &same, echo, &DuckAttribute::default()).unwrap(),
            GenericArguments::Forwarded
        );
    }
}
