#![allow(dead_code)]

use dotnet_duck::{
    assemblies::{Assembly, AssemblyLoader},
    types::{
        access::AccessContext,
        attributes::BindingFlags,
        builder::TypeBuilder,
        TypeDescription,
    },
    DuckProxy, DuckType, Value,
};

/// Host types for one test, declared in their own assembly so tests never
/// collide in the process-wide registry.
pub struct Fixture {
    pub assembly: &'static Assembly,
    namespace: String,
}

impl Fixture {
    pub fn new(namespace: &str) -> Self {
        Self {
            assembly: AssemblyLoader::global().load_assembly(namespace),
            namespace: namespace.to_string(),
        }
    }

    pub fn name(&self, ty: &str) -> String {
        format!("{}.{}", self.namespace, ty)
    }

    pub fn class(&self, ty: &str) -> TypeBuilder {
        TypeBuilder::class(self.assembly, &self.name(ty))
    }

    pub fn interface(&self, ty: &str) -> TypeBuilder {
        TypeBuilder::interface(self.assembly, &self.name(ty))
    }

    pub fn structure(&self, ty: &str) -> TypeBuilder {
        TypeBuilder::structure(self.assembly, &self.name(ty))
    }
}

/// Adapts `instance` to `shape`, panicking on failure.
pub fn adapt(shape: TypeDescription, instance: &Value) -> DuckProxy {
    let adapter = DuckType::global()
        .create(shape, instance)
        .unwrap_or_else(|e| panic!("cannot adapt {:?} to {:?}: {}", instance, shape, e));
    DuckProxy::new(adapter).unwrap()
}

/// Reads a property of `instance` the way reflection would, ignoring visibility.
pub fn read_property(instance: &Value, name: &str) -> Value {
    let td = instance.type_handle().unwrap();
    td.find_property(name, BindingFlags::DEFAULT, None)
        .and_then(|p| p.getter())
        .unwrap()
        .invoke(&AccessContext::SkipVisibility, Some(instance.clone()), &mut [], &[])
        .unwrap()
}

pub fn write_property(instance: &Value, name: &str, value: Value) {
    let td = instance.type_handle().unwrap();
    td.find_property(name, BindingFlags::DEFAULT, None)
        .and_then(|p| p.setter())
        .unwrap()
        .invoke(&AccessContext::SkipVisibility, Some(instance.clone()), &mut [value], &[])
        .unwrap();
}

pub fn read_field(instance: &Value, name: &str) -> Value {
    let td = instance.type_handle().unwrap();
    td.field_named(name)
        .unwrap()
        .get(&AccessContext::SkipVisibility, Some(instance))
        .unwrap()
}
