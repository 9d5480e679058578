//! Generated adapter types and the handle callers use to drive adapters.
use crate::{
    assemblies::AssemblyLoader,
    duck::{
        emit::{executor::execute, ForwardingRoutine},
        module::ModuleBuilder,
    },
    error::{DuckTypeError, RuntimeError},
    types::{
        access::AccessContext, attributes::BindingFlags, comparer::TypeComparer,
        members::MethodDescription, runtime::RuntimeType, TypeDescription,
    },
    utils::sync::Arc,
    value::{ObjectRef, Value},
};
use std::fmt::{Debug, Formatter};

/// A generated adapter type for one (shape, target) pair.
pub struct ProxyType {
    pub(crate) description: TypeDescription,
    pub(crate) shape: TypeDescription,
    pub(crate) target: TypeDescription,
    pub(crate) module: Arc<ModuleBuilder>,
    pub(crate) instance_slot: usize,
    /// Snapshot routine of a data-copy shape, run over a transient adapter.
    pub(crate) copy: Option<Arc<ForwardingRoutine>>,
}

impl ProxyType {
    /// The adapter class; for data-copy shapes the transient live adapter.
    pub fn description(&self) -> TypeDescription {
        self.description
    }

    pub fn shape(&self) -> TypeDescription {
        self.shape
    }

    pub fn target(&self) -> TypeDescription {
        self.target
    }

    pub fn module(&self) -> &ModuleBuilder {
        &self.module
    }

    pub fn is_copy(&self) -> bool {
        self.copy.is_some()
    }

    pub fn create_instance(&self, instance: Value) -> Result<Value, DuckTypeError> {
        let adapter = ObjectRef::new(self.description);
        adapter.write_field(self.instance_slot, instance)?;
        match &self.copy {
            None => Ok(Value::Object(adapter)),
            Some(routine) => Ok(execute(routine, &Value::Object(adapter), &mut [], &[])?),
        }
    }
}

impl Debug for ProxyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyType")
            .field("description", &self.description)
            .field("shape", &self.shape)
            .field("target", &self.target)
            .field("module", &self.module.assembly().name)
            .field("copy", &self.is_copy())
            .finish()
    }
}

fn duck_property(name: &str) -> Option<MethodDescription> {
    AssemblyLoader::global()
        .duck_type_interface()
        .property_named(name)
        .and_then(|p| p.getter())
}

/// The target wrapped by `adapter`, or `None` if it is not an adapter.
pub(crate) fn duck_instance(adapter: &ObjectRef) -> Result<Option<Value>, RuntimeError> {
    let duck_type = AssemblyLoader::global().duck_type_interface();
    if !adapter.description().implements(duck_type) {
        return Ok(None);
    }
    let getter = duck_property("Instance")
        .ok_or_else(|| RuntimeError::MemberNotFound("IDuckType::Instance".to_string()))?;
    getter
        .invoke(
            &AccessContext::SkipVisibility,
            Some(Value::Object(adapter.clone())),
            &mut [],
            &[],
        )
        .map(Some)
}

fn argument_fits(argument: &Value, parameter: &RuntimeType) -> bool {
    if parameter.is_generic_parameter() {
        return true;
    }
    match argument.runtime_type() {
        None => !parameter.is_value_type(),
        Some(actual) => {
            TypeComparer::types_equal_decayed(&actual, parameter)
                || TypeComparer::is_assignable_from(parameter, &actual)
        }
    }
}

/// Untyped access to an adapter instance by member name.
///
/// Calls are made the way outside code would make them: only the adapter's
/// public surface is reachable.
#[derive(Clone, Debug, PartialEq)]
pub struct DuckProxy {
    object: ObjectRef,
}

impl DuckProxy {
    pub fn new(value: Value) -> Result<Self, DuckTypeError> {
        let duck_type = AssemblyLoader::global().duck_type_interface();
        match value {
            Value::Object(object) if object.description().implements(duck_type) => {
                Ok(Self { object })
            }
            other => Err(RuntimeError::InvalidCast {
                actual: other
                    .runtime_type()
                    .map_or_else(|| "null".to_string(), |t| t.full_name()),
                expected: duck_type.type_name(),
            }
            .into()),
        }
    }

    pub fn value(&self) -> Value {
        Value::Object(self.object.clone())
    }

    /// The adapted target instance.
    pub fn instance(&self) -> Result<Value, RuntimeError> {
        duck_instance(&self.object)?.ok_or(RuntimeError::NullReference)
    }

    pub fn proxy_type(&self) -> TypeDescription {
        self.object.description()
    }

    /// Full name of the adapted target type, as reported by `IDuckType.Type`.
    pub fn target_type(&self) -> Result<String, RuntimeError> {
        let getter = duck_property("Type")
            .ok_or_else(|| RuntimeError::MemberNotFound("IDuckType::Type".to_string()))?;
        let name = self.invoke(getter, &mut [], &[])?;
        Ok(name.as_str().unwrap_or_default().to_string())
    }

    fn invoke(
        &self,
        method: MethodDescription,
        args: &mut [Value],
        generics: &[RuntimeType],
    ) -> Result<Value, RuntimeError> {
        method.invoke(&AccessContext::Public, Some(self.value()), args, generics)
    }

    fn accessor(
        &self,
        name: &str,
        index_count: usize,
        setter: bool,
    ) -> Result<MethodDescription, RuntimeError> {
        let td = self.proxy_type();
        td.properties(BindingFlags::INSTANCE | BindingFlags::PUBLIC)
            .into_iter()
            .filter(|p| p.name() == name && p.index_parameters().len() == index_count)
            .find_map(|p| if setter { p.setter() } else { p.getter() })
            .ok_or_else(|| RuntimeError::MemberNotFound(format!("{}::{}", td.type_name(), name)))
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        let getter = self.accessor(name, 0, false)?;
        self.invoke(getter, &mut [], &[])
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), RuntimeError> {
        let setter = self.accessor(name, 0, true)?;
        self.invoke(setter, &mut [value.into()], &[])?;
        Ok(())
    }

    /// Reads the indexer (`Item`) taking `index.len()` arguments.
    pub fn get_index(&self, index: &[Value]) -> Result<Value, RuntimeError> {
        let getter = self.accessor("Item", index.len(), false)?;
        self.invoke(getter, &mut index.to_vec(), &[])
    }

    pub fn set_index(&self, index: &[Value], value: impl Into<Value>) -> Result<(), RuntimeError> {
        let setter = self.accessor("Item", index.len(), true)?;
        let mut args = index.to_vec();
        args.push(value.into());
        self.invoke(setter, &mut args, &[])?;
        Ok(())
    }

    /// Calls the public method `name` whose parameters accept `args`.
    /// `ref` and `out` results are written back into `args`.
    pub fn call(&self, name: &str, args: &mut [Value]) -> Result<Value, RuntimeError> {
        self.call_generic(name, &[], args)
    }

    pub fn call_generic(
        &self,
        name: &str,
        generics: &[RuntimeType],
        args: &mut [Value],
    ) -> Result<Value, RuntimeError> {
        let td = self.proxy_type();
        let candidates: Vec<_> = td
            .methods(BindingFlags::INSTANCE | BindingFlags::PUBLIC)
            .into_iter()
            .filter(|m| {
                m.name() == name
                    && !m.method.special_name
                    && m.parameters().len() == args.len()
                    && m.method.generic_parameters.len() == generics.len()
            })
            .collect();

        let method = candidates
            .iter()
            .find(|m| {
                m.parameters()
                    .iter()
                    .zip(args.iter())
                    .all(|(p, a)| {
                        p.kind.is_out() || argument_fits(a, &p.parameter_type.substitute(generics))
                    })
            })
            .copied()
            .ok_or_else(|| RuntimeError::MemberNotFound(format!("{}::{}", td.type_name(), name)))?;

        self.invoke(method, args, generics)
    }
}
