//! Process-wide registry of assemblies and the types they define.
use crate::{
    error::TypeResolutionError,
    types::{
        builder::{MethodBuilder, PropertyBuilder, TypeBuilder},
        runtime::RuntimeType,
        TypeDefinition, TypeDescription,
    },
    utils::{
        leak,
        sync::{AtomicU64, OnceLock, Ordering, RwLock},
    },
    value::Value,
};
use dashmap::DashMap;
use std::{
    collections::{hash_map::DefaultHasher, HashMap},
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
};
use tracing::{debug, trace};

pub const CORLIB_ASSEMBLY: &str = "System.Private.CoreLib";
pub const DUCK_ASSEMBLY: &str = "DotnetDuck";
pub const DUCK_TYPE_INTERFACE: &str = "DotnetDuck.IDuckType";

pub struct Assembly {
    pub name: String,
    pub is_core: bool,
    pub is_dynamic: bool,
    types: RwLock<Vec<TypeDescription>>,
}

impl Assembly {
    fn new(name: &str, is_core: bool, is_dynamic: bool) -> Self {
        Self {
            name: name.to_string(),
            is_core,
            is_dynamic,
            types: RwLock::new(vec![]),
        }
    }

    /// Adds a type header; full names are unique within an assembly.
    pub(crate) fn register(
        &self,
        definition: TypeDefinition,
    ) -> Result<TypeDescription, TypeResolutionError> {
        let mut types = self.types.write();
        let td = TypeDescription::new(leak(definition));
        let name = td.type_name();
        if types.iter().any(|t| t.type_name() == name) {
            return Err(TypeResolutionError::DuplicateType(name));
        }
        trace!("registered {} in {}", name, self.name);
        types.push(td);
        Ok(td)
    }

    pub fn types(&self) -> Vec<TypeDescription> {
        self.types.read().clone()
    }

    pub fn find_type(&self, full_name: &str) -> Option<TypeDescription> {
        self.types
            .read()
            .iter()
            .find(|t| t.type_name() == full_name)
            .copied()
    }
}

impl Debug for Assembly {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.name)
    }
}

pub struct AssemblyLoader {
    assemblies: RwLock<HashMap<String, &'static Assembly>>,
    corlib: &'static Assembly,
    core_types: HashMap<String, TypeDescription>,
    object: TypeDescription,
    duck_type: TypeDescription,
    type_cache: DashMap<String, TypeDescription>,
    pub type_cache_hits: AtomicU64,
    pub type_cache_misses: AtomicU64,
}

static LOADER: OnceLock<AssemblyLoader> = OnceLock::new();

fn hash_code(value: &Value) -> i32 {
    let mut hasher = DefaultHasher::new();
    match value {
        Value::Object(o) => o.address().hash(&mut hasher),
        other => other.to_display_string().hash(&mut hasher),
    }
    hasher.finish() as i32
}

fn corlib_object(corlib: &'static Assembly) -> Result<TypeDescription, TypeResolutionError> {
    TypeBuilder::class(corlib, "System.Object")
        .root()
        .method(
            MethodBuilder::new("ToString")
                .virtual_member()
                .returns(RuntimeType::String)
                .body(|ctx| Ok(Value::from(ctx.this()?.to_display_string()))),
        )
        .method(
            MethodBuilder::new("Equals")
                .virtual_member()
                .param("obj", RuntimeType::Object)
                .returns(RuntimeType::Boolean)
                .body(|ctx| Ok(Value::Boolean(*ctx.this()? == ctx.arg(0)?))),
        )
        .method(
            MethodBuilder::new("GetHashCode")
                .virtual_member()
                .returns(RuntimeType::Int32)
                .body(|ctx| Ok(Value::Int32(hash_code(ctx.this()?)))),
        )
        .build()
}

impl AssemblyLoader {
    pub fn global() -> &'static AssemblyLoader {
        LOADER.get_or_init(|| match AssemblyLoader::bootstrap() {
            Ok(loader) => loader,
            Err(e) => panic!("failed to bootstrap the core library: {}", e),
        })
    }

    fn bootstrap() -> Result<Self, TypeResolutionError> {
        let corlib: &'static Assembly = leak(Assembly::new(CORLIB_ASSEMBLY, true, false));
        let duck: &'static Assembly = leak(Assembly::new(DUCK_ASSEMBLY, false, false));

        let object = corlib_object(corlib)?;
        let value_type = TypeBuilder::class(corlib, "System.ValueType")
            .abstract_type()
            .extends(object)
            .build()?;
        let enum_type = TypeBuilder::class(corlib, "System.Enum")
            .abstract_type()
            .extends(value_type)
            .build()?;
        let string = TypeBuilder::class(corlib, "System.String")
            .sealed()
            .extends(object)
            .build()?;

        let mut core_types = HashMap::new();
        for t in [object, value_type, enum_type, string] {
            core_types.insert(t.type_name(), t);
        }
        for primitive in [
            "Void", "Boolean", "Char", "SByte", "Byte", "Int16", "UInt16", "Int32", "UInt32",
            "Int64", "UInt64", "Single", "Double",
        ] {
            let td = TypeBuilder::structure(corlib, &format!("System.{}", primitive))
                .extends(value_type)
                .build()?;
            core_types.insert(td.type_name(), td);
        }

        let duck_type = TypeBuilder::interface(duck, DUCK_TYPE_INTERFACE)
            .property(PropertyBuilder::new("Instance", RuntimeType::Object).readable())
            .property(PropertyBuilder::new("Type", RuntimeType::String).readable())
            .build()?;

        let mut assemblies = HashMap::new();
        assemblies.insert(corlib.name.clone(), corlib);
        assemblies.insert(duck.name.clone(), duck);

        debug!("bootstrapped {} core types", core_types.len());

        Ok(Self {
            assemblies: RwLock::new(assemblies),
            corlib,
            core_types,
            object,
            duck_type,
            type_cache: DashMap::new(),
            type_cache_hits: AtomicU64::new(0),
            type_cache_misses: AtomicU64::new(0),
        })
    }

    pub fn corlib(&self) -> &'static Assembly {
        self.corlib
    }

    pub fn object_type(&self) -> TypeDescription {
        self.object
    }

    /// The interface every generated adapter implements.
    pub fn duck_type_interface(&self) -> TypeDescription {
        self.duck_type
    }

    pub fn corlib_type(&self, name: &str) -> Result<TypeDescription, TypeResolutionError> {
        self.core_types
            .get(name)
            .copied()
            .ok_or_else(|| TypeResolutionError::TypeNotFound(name.to_string()))
    }

    /// The core definition behind a built-in runtime type.
    pub fn core_type(&self, ty: &RuntimeType) -> TypeDescription {
        match ty {
            RuntimeType::Type(td) => *td,
            other => self
                .core_types
                .get(&other.full_name())
                .copied()
                .unwrap_or(self.object),
        }
    }

    /// Returns the named assembly, creating an empty one on first use.
    pub fn load_assembly(&self, name: &str) -> &'static Assembly {
        if let Some(existing) = self.assembly(name) {
            return existing;
        }
        let mut assemblies = self.assemblies.write();
        *assemblies.entry(name.to_string()).or_insert_with(|| {
            debug!("created assembly {}", name);
            leak(Assembly::new(name, false, false))
        })
    }

    pub fn define_dynamic_assembly(
        &self,
        name: &str,
    ) -> Result<&'static Assembly, TypeResolutionError> {
        let mut assemblies = self.assemblies.write();
        if assemblies.contains_key(name) {
            return Err(TypeResolutionError::DuplicateType(name.to_string()));
        }
        let assembly: &'static Assembly = leak(Assembly::new(name, false, true));
        assemblies.insert(name.to_string(), assembly);
        debug!("created dynamic assembly {}", name);
        Ok(assembly)
    }

    pub fn assembly(&self, name: &str) -> Option<&'static Assembly> {
        self.assemblies.read().get(name).copied()
    }

    /// Resolves a full type name, optionally assembly-qualified
    /// (`"Name.Space.Type, AssemblyName"`). Core primitives resolve to their
    /// built-in runtime types.
    pub fn find_type(&self, name: &str) -> Result<RuntimeType, TypeResolutionError> {
        let bare = name.split(',').next().unwrap_or(name).trim();
        if let Some(simple) = RuntimeType::from_core_name(bare) {
            return Ok(simple);
        }
        self.find_type_description(name).map(RuntimeType::Type)
    }

    /// Hits, misses and size of the type name lookup cache.
    pub fn type_cache_stats(&self) -> (u64, u64, usize) {
        (
            self.type_cache_hits.load(Ordering::Relaxed),
            self.type_cache_misses.load(Ordering::Relaxed),
            self.type_cache.len(),
        )
    }

    pub fn find_type_description(&self, name: &str) -> Result<TypeDescription, TypeResolutionError> {
        let key = name.trim();
        if let Some(cached) = self.type_cache.get(key) {
            self.type_cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(*cached);
        }
        self.type_cache_misses.fetch_add(1, Ordering::Relaxed);

        let (type_name, assembly_name) = match key.split_once(',') {
            Some((t, a)) => (t.trim(), Some(a.trim())),
            None => (key, None),
        };

        let found = match assembly_name {
            Some(a) => self.assembly(a).and_then(|asm| asm.find_type(type_name)),
            None => {
                let assemblies: Vec<_> = self.assemblies.read().values().copied().collect();
                assemblies.iter().find_map(|asm| asm.find_type(type_name))
            }
        };

        match found {
            Some(td) => {
                self.type_cache.insert(key.to_string(), td);
                Ok(td)
            }
            None => Err(TypeResolutionError::TypeNotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_library_is_bootstrapped() {
        let loader = AssemblyLoader::global();
        let object = loader.object_type();
        assert_eq!(object.type_name(), "System.Object");
        assert!(object.definition().extends.is_none());

        let int32 = loader.corlib_type("System.Int32").unwrap();
        assert!(int32.is_value_type());
        assert_eq!(
            int32.ancestors().map(|t| t.type_name()).collect::<Vec<_>>(),
            vec!["System.Int32", "System.ValueType", "System.Object"]
        );
        assert!(loader.duck_type_interface().is_interface());
    }

    #[test]
    fn type_lookup_is_cached() {
        let loader = AssemblyLoader::global();
        let asm = loader.load_assembly("Loader.Tests");
        let td = TypeBuilder::class(asm, "Loader.Tests.Widget").build().unwrap();

        let misses = loader.type_cache_misses.load(Ordering::Relaxed);
        assert_eq!(loader.find_type_description("Loader.Tests.Widget").unwrap(), td);
        assert_eq!(
            loader.find_type("Loader.Tests.Widget, Loader.Tests").unwrap(),
            RuntimeType::Type(td)
        );
        assert!(loader.type_cache_misses.load(Ordering::Relaxed) >= misses + 2);

        let hits = loader.type_cache_hits.load(Ordering::Relaxed);
        loader.find_type_description("Loader.Tests.Widget").unwrap();
        assert!(loader.type_cache_hits.load(Ordering::Relaxed) > hits);
    }

    #[test]
    fn primitive_names_resolve_to_runtime_types() {
        let loader = AssemblyLoader::global();
        assert_eq!(loader.find_type("System.String").unwrap(), RuntimeType::String);
        assert_eq!(loader.find_type("System.Int64, System.Private.CoreLib").unwrap(), RuntimeType::Int64);
        assert!(matches!(
            loader.find_type("Nope.Missing"),
            Err(TypeResolutionError::TypeNotFound(_))
        ));
    }

    #[test]
    fn dynamic_assembly_names_are_unique() {
        let loader = AssemblyLoader::global();
        loader.define_dynamic_assembly("Loader.Tests.Dynamic").unwrap();
        assert!(loader.define_dynamic_assembly("Loader.Tests.Dynamic").is_err());
        assert!(loader.assembly("Loader.Tests.Dynamic").unwrap().is_dynamic);
    }
}
