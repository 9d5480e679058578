use crate::{
    assemblies::AssemblyLoader,
    types::{runtime::RuntimeType, TypeDescription},
};
use std::sync::Arc;

pub mod object;

pub use object::{ObjectRef, StructValue};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Char(char),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(Arc<str>),
    Struct(StructValue),
    Object(ObjectRef),
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    char => Char,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    StructValue => Struct,
    ObjectRef => Object,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl Value {
    /// The zero value of a slot of type `ty`.
    pub fn default_for(ty: &RuntimeType) -> Value {
        use RuntimeType::*;
        match ty {
            Boolean => Value::Boolean(false),
            Char => Value::Char('\0'),
            Int8 => Value::Int8(0),
            UInt8 => Value::UInt8(0),
            Int16 => Value::Int16(0),
            UInt16 => Value::UInt16(0),
            Int32 => Value::Int32(0),
            UInt32 => Value::UInt32(0),
            Int64 => Value::Int64(0),
            UInt64 => Value::UInt64(0),
            Float32 => Value::Float32(0.0),
            Float64 => Value::Float64(0.0),
            Type(td) => match td.is_enum() {
                Some(underlying) => Value::default_for(underlying),
                None if td.is_value_type() => Value::Struct(StructValue::new(*td)),
                None => Value::Null,
            },
            Object | String | Void | MethodParameter(_) => Value::Null,
        }
    }

    pub fn new_object(td: TypeDescription) -> Value {
        Value::Object(ObjectRef::new(td))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The definition of the value's runtime type; `None` for null.
    pub fn type_handle(&self) -> Option<TypeDescription> {
        match self {
            Value::Null => None,
            Value::Struct(s) => Some(s.description),
            Value::Object(o) => Some(o.description()),
            other => other
                .runtime_type()
                .map(|t| AssemblyLoader::global().core_type(&t)),
        }
    }

    /// The value's runtime type; boxes report the type they hold.
    pub fn runtime_type(&self) -> Option<RuntimeType> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => RuntimeType::Boolean,
            Value::Char(_) => RuntimeType::Char,
            Value::Int8(_) => RuntimeType::Int8,
            Value::UInt8(_) => RuntimeType::UInt8,
            Value::Int16(_) => RuntimeType::Int16,
            Value::UInt16(_) => RuntimeType::UInt16,
            Value::Int32(_) => RuntimeType::Int32,
            Value::UInt32(_) => RuntimeType::UInt32,
            Value::Int64(_) => RuntimeType::Int64,
            Value::UInt64(_) => RuntimeType::UInt64,
            Value::Float32(_) => RuntimeType::Float32,
            Value::Float64(_) => RuntimeType::Float64,
            Value::String(_) => RuntimeType::String,
            Value::Struct(s) => RuntimeType::Type(s.description),
            Value::Object(o) => match o.boxed_value() {
                Some(inner) => return inner.runtime_type(),
                None => RuntimeType::from_description(o.description()),
            },
        })
    }

    pub fn is_value_type(&self) -> bool {
        !matches!(self, Value::Null | Value::String(_) | Value::Object(_))
    }

    /// Boxes value-type values; references are returned unchanged.
    pub fn boxed(self) -> Value {
        if self.is_value_type() {
            Value::Object(ObjectRef::boxed(self))
        } else {
            self
        }
    }

    /// The contents of a box, or the value itself.
    pub fn unboxed(&self) -> Value {
        match self {
            Value::Object(o) => o.boxed_value().cloned().unwrap_or_else(|| self.clone()),
            other => other.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unboxed() {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.unboxed() {
            Value::Int32(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.unboxed() {
            Value::Int64(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Rendering used by `System.Object.ToString`.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
            Value::Char(c) => c.to_string(),
            Value::Int8(i) => i.to_string(),
            Value::UInt8(i) => i.to_string(),
            Value::Int16(i) => i.to_string(),
            Value::UInt16(i) => i.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::UInt32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::UInt64(i) => i.to_string(),
            Value::Float32(f) => f.to_string(),
            Value::Float64(f) => f.to_string(),
            Value::String(s) => s.to_string(),
            Value::Struct(s) => s.description.type_name(),
            Value::Object(o) => match o.boxed_value() {
                Some(inner) => inner.to_display_string(),
                None => o.description().type_name(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxing_preserves_runtime_type() {
        let boxed = Value::Int32(5).boxed();
        assert!(matches!(boxed, Value::Object(_)));
        assert_eq!(boxed.runtime_type(), Some(RuntimeType::Int32));
        assert_eq!(boxed.unboxed(), Value::Int32(5));
        assert_eq!(boxed.as_i32(), Some(5));
        assert_eq!(Value::from("x").boxed(), Value::from("x"));
    }

    #[test]
    fn defaults_follow_slot_type() {
        assert_eq!(Value::default_for(&RuntimeType::Int64), Value::Int64(0));
        assert_eq!(Value::default_for(&RuntimeType::String), Value::Null);
        assert_eq!(Value::default_for(&RuntimeType::Object), Value::Null);
    }

    #[test]
    fn objects_compare_by_identity() {
        let object = AssemblyLoader::global().object_type();
        let a = Value::new_object(object);
        let b = Value::new_object(object);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.to_display_string(), "System.Object");
    }
}
