use crate::{
    error::RuntimeError,
    types::TypeDescription,
    utils::{sync::RwLock, DebugStr},
    value::Value,
};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

pub enum HeapStorage {
    Obj(RwLock<Vec<Value>>),
    Boxed(Value),
}

pub struct Object {
    pub description: TypeDescription,
    storage: HeapStorage,
}

/// Shared handle to a heap object; equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

fn instance_defaults(td: TypeDescription) -> Vec<Value> {
    let mut fields = vec![Value::Null; td.instance_field_count()];
    for ancestor in td.ancestors() {
        for f in ancestor.declared_fields().filter(|f| !f.is_static()) {
            if let Some(slot) = fields.get_mut(f.field.slot) {
                *slot = Value::default_for(&f.field.field_type);
            }
        }
    }
    fields
}

impl ObjectRef {
    /// Allocates an instance of a class with every field at its default.
    pub fn new(td: TypeDescription) -> Self {
        Self(Arc::new(Object {
            description: td,
            storage: HeapStorage::Obj(RwLock::new(instance_defaults(td))),
        }))
    }

    /// Boxes a value-type value; the box has the value's own type.
    pub fn boxed(value: Value) -> Self {
        let description = value
            .type_handle()
            .unwrap_or_else(|| crate::assemblies::AssemblyLoader::global().object_type());
        Self(Arc::new(Object {
            description,
            storage: HeapStorage::Boxed(value),
        }))
    }

    pub fn description(&self) -> TypeDescription {
        self.0.description
    }

    pub fn boxed_value(&self) -> Option<&Value> {
        match &self.0.storage {
            HeapStorage::Boxed(v) => Some(v),
            HeapStorage::Obj(_) => None,
        }
    }

    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn read_field(&self, slot: usize) -> Result<Value, RuntimeError> {
        match &self.0.storage {
            HeapStorage::Obj(fields) => fields.read().get(slot).cloned().ok_or_else(|| {
                RuntimeError::InvalidProgram(format!(
                    "field slot {} out of range on {:?}",
                    slot, self.0.description
                ))
            }),
            HeapStorage::Boxed(Value::Struct(s)) => s.get(slot),
            HeapStorage::Boxed(other) => Err(RuntimeError::InvalidProgram(format!(
                "cannot load a field from boxed {:?}",
                other
            ))),
        }
    }

    pub fn write_field(&self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        match &self.0.storage {
            HeapStorage::Obj(fields) => match fields.write().get_mut(slot) {
                Some(s) => {
                    *s = value;
                    Ok(())
                }
                None => Err(RuntimeError::InvalidProgram(format!(
                    "field slot {} out of range on {:?}",
                    slot, self.0.description
                ))),
            },
            HeapStorage::Boxed(_) => Err(RuntimeError::InvalidProgram(format!(
                "cannot store into boxed {:?}",
                self.0.description
            ))),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0.storage {
            HeapStorage::Boxed(v) => write!(f, "box {:?}", v),
            HeapStorage::Obj(fields) => f
                .debug_tuple(&self.0.description.type_name())
                .field(&DebugStr(format!("{:#x}", self.address())))
                .field(&fields.read().len())
                .finish(),
        }
    }
}

/// An unboxed value-type instance; copies are independent.
#[derive(Clone, PartialEq)]
pub struct StructValue {
    pub description: TypeDescription,
    fields: Vec<Value>,
}

impl StructValue {
    pub fn new(td: TypeDescription) -> Self {
        Self {
            description: td,
            fields: instance_defaults(td),
        }
    }

    pub fn get(&self, slot: usize) -> Result<Value, RuntimeError> {
        self.fields.get(slot).cloned().ok_or_else(|| {
            RuntimeError::InvalidProgram(format!(
                "field slot {} out of range on {:?}",
                slot, self.description
            ))
        })
    }

    pub fn set(&mut self, slot: usize, value: Value) -> Result<(), RuntimeError> {
        match self.fields.get_mut(slot) {
            Some(s) => {
                *s = value;
                Ok(())
            }
            None => Err(RuntimeError::InvalidProgram(format!(
                "field slot {} out of range on {:?}",
                slot, self.description
            ))),
        }
    }

    /// Reads a field by name.
    pub fn field(&self, name: &str) -> Option<Value> {
        let f = self.description.field_named(name)?;
        self.fields.get(f.field.slot).cloned()
    }
}

impl Debug for StructValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct(&self.description.type_name());
        for field in self.description.declared_fields().filter(|f| !f.is_static()) {
            if let Some(v) = self.fields.get(field.field.slot) {
                s.field(field.name(), v);
            }
        }
        s.finish()
    }
}
