use crate::{assemblies::AssemblyLoader, types::TypeDescription};

runtime_type_impls! {
    simple_types: {
        Boolean => "Boolean",
        Char => "Char",
        Int8 => "SByte",
        UInt8 => "Byte",
        Int16 => "Int16",
        UInt16 => "UInt16",
        Int32 => "Int32",
        UInt32 => "UInt32",
        Int64 => "Int64",
        UInt64 => "UInt64",
        Float32 => "Single",
        Float64 => "Double",
        Object => "Object",
        String => "String",
    },
    complex_types: {
        Void,
        Type(TypeDescription),
        MethodParameter(u16),
    },
    get_name: {
        Void => "Void".to_string(),
        Type(td) => td.name().to_string(),
        MethodParameter(index) => format!("!!{}", index),
    },
    full_name: {
        Void => "System.Void".to_string(),
        Type(td) => td.type_name(),
        MethodParameter(index) => format!("!!{}", index),
    }
}

impl RuntimeType {
    /// Normalizes a type handle: core primitive definitions collapse onto their
    /// built-in variants so both spellings compare equal.
    pub fn from_description(td: TypeDescription) -> RuntimeType {
        if td.assembly().is_core {
            if let Some(simple) = RuntimeType::from_core_name(&td.type_name()) {
                return simple;
            }
        }
        RuntimeType::Type(td)
    }

    /// The definition backing this type; placeholders resolve to `System.Object`.
    pub fn type_description(&self) -> TypeDescription {
        let loader = AssemblyLoader::global();
        match self {
            RuntimeType::Type(td) => *td,
            RuntimeType::MethodParameter(_) => loader.object_type(),
            other => loader.core_type(other),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, RuntimeType::Void)
    }

    pub fn is_generic_parameter(&self) -> bool {
        matches!(self, RuntimeType::MethodParameter(_))
    }

    pub fn is_value_type(&self) -> bool {
        use RuntimeType::*;
        match self {
            Boolean | Char | Int8 | UInt8 | Int16 | UInt16 | Int32 | UInt32 | Int64 | UInt64
            | Float32 | Float64 => true,
            Object | String | Void | MethodParameter(_) => false,
            Type(td) => td.is_value_type(),
        }
    }

    /// Interfaces, abstract classes and `Object` can stand in for unrelated
    /// runtime values, so matching never rejects them by declared type.
    pub fn is_open_reference(&self) -> bool {
        match self {
            RuntimeType::Object => true,
            RuntimeType::Type(td) => td.is_interface() || td.is_abstract(),
            _ => false,
        }
    }

    /// Whether the type belongs to the core library rather than user code.
    pub fn is_core_type(&self) -> bool {
        match self {
            RuntimeType::Type(td) => td.assembly().is_core,
            RuntimeType::MethodParameter(_) => false,
            _ => true,
        }
    }

    /// Enums decay to their underlying primitive, everything else is itself.
    pub fn decay(&self) -> RuntimeType {
        match self {
            RuntimeType::Type(td) => match td.is_enum() {
                Some(underlying) => underlying.clone(),
                None => self.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Replaces method generic placeholders with concrete arguments.
    pub fn substitute(&self, generics: &[RuntimeType]) -> RuntimeType {
        match self {
            RuntimeType::MethodParameter(index) => generics
                .get(*index as usize)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            _ => self.clone(),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.full_name() == name || self.get_name() == name
    }
}

impl From<TypeDescription> for RuntimeType {
    fn from(value: TypeDescription) -> Self {
        RuntimeType::from_description(value)
    }
}
