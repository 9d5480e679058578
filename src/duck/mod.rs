//! Structural duck typing.
//!
//! [`DuckType`] builds, caches and instantiates adapter types: given a shape
//! (an interface, abstract class or data-copy struct) and any target value,
//! it produces an object implementing the shape whose members forward to the
//! target's structurally matching members, whatever their visibility.
//!
//! Adapter types are generated at most once per (shape, target) pair. A
//! failed generation is cached too and every later request for the pair
//! gets the same error back.
use crate::{
    assemblies::AssemblyLoader,
    error::DuckTypeError,
    types::TypeDescription,
    utils::sync::{Arc, Mutex, OnceLock},
    value::Value,
};
use dashmap::DashMap;
use tracing::{debug, trace, warn};

pub mod builder;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod emit;
pub mod matcher;
pub mod metrics;
pub mod module;
pub mod proxy;

pub use cache::{CreateCache, CreateTypeResult};
pub use config::DuckTypeConfig;
pub use metrics::{CacheStat, CacheStats, DuckMetrics};
pub use proxy::{DuckProxy, ProxyType};

type ProxyCell = Arc<OnceLock<Arc<CreateTypeResult>>>;

/// The adapter factory.
pub struct DuckType {
    loader: &'static AssemblyLoader,
    cache: DashMap<(TypeDescription, TypeDescription), ProxyCell>,
    /// Serializes generation; type registration is not reentrant.
    generation_lock: Mutex<()>,
    modules: module::ModuleRegistry,
    metrics: Arc<DuckMetrics>,
    config: DuckTypeConfig,
}

static FACTORY: OnceLock<DuckType> = OnceLock::new();

impl DuckType {
    fn new(loader: &'static AssemblyLoader, config: DuckTypeConfig) -> Self {
        let metrics = Arc::new(DuckMetrics::new(config.collect_stats));
        Self {
            loader,
            cache: DashMap::new(),
            generation_lock: Mutex::new(()),
            modules: module::ModuleRegistry::new(metrics.clone()),
            metrics,
            config,
        }
    }

    /// The process-wide factory, configured from the environment on first use.
    pub fn global() -> &'static DuckType {
        FACTORY.get_or_init(|| {
            let config = DuckTypeConfig::from_env();
            debug!("initializing duck type factory with {:?}", config);
            DuckType::new(AssemblyLoader::global(), config)
        })
    }

    pub fn metrics(&self) -> &DuckMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &DuckTypeConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics
            .cache_statistics(self.cache.len(), self.loader.type_cache_stats())
    }

    /// Splits an instance into the type to adapt and the value the adapter
    /// will hold. Boxes are opened, so a boxed struct adapts as the struct.
    pub(crate) fn target_of(instance: &Value) -> Result<(TypeDescription, Value), DuckTypeError> {
        let value = instance.unboxed();
        match value.type_handle() {
            Some(td) => Ok((td, value)),
            None => Err(DuckTypeError::ArgumentNull),
        }
    }

    /// The cached adapter type of `shape` over `target`, generating it if
    /// this is the first request for the pair.
    pub fn get_or_create_proxy_type(
        &self,
        shape: TypeDescription,
        target: TypeDescription,
    ) -> Arc<CreateTypeResult> {
        let cell = self.cache.entry((shape, target)).or_default().clone();
        if let Some(result) = cell.get() {
            self.metrics.record_proxy_cache_hit();
            trace!("proxy cache hit for {:?} over {:?}", shape, target);
            return result.clone();
        }

        let _guard = self.generation_lock.lock();
        if let Some(result) = cell.get() {
            self.metrics.record_proxy_cache_hit();
            return result.clone();
        }
        self.metrics.record_proxy_cache_miss();
        cell.get_or_init(|| Arc::new(self.generate(shape, target)))
            .clone()
    }

    fn generate(&self, shape: TypeDescription, target: TypeDescription) -> CreateTypeResult {
        debug!("generating adapter of {:?} over {:?}", shape, target);
        let proxy = builder::build_proxy_type(self.loader, &self.modules, &self.config, shape, target)
            .map(Arc::new);
        match &proxy {
            Ok(proxy) => debug!("generated {:?}", proxy),
            Err(e) => warn!("cannot adapt {:?} to {:?}: {}", target, shape, e),
        }
        self.metrics.record_generation(proxy.is_ok());
        CreateTypeResult::new(shape, target, proxy)
    }

    /// Wraps `instance` in an adapter implementing `shape`.
    pub fn create(&self, shape: TypeDescription, instance: &Value) -> Result<Value, DuckTypeError> {
        if shape.is_null() {
            return Err(DuckTypeError::ArgumentNull);
        }
        let (target, instance) = Self::target_of(instance)?;
        self.get_or_create_proxy_type(shape, target)
            .create_instance(instance)
    }

    /// Whether `instance` can be adapted to `shape`; generates the adapter
    /// type as a side effect.
    pub fn can_create(&self, shape: TypeDescription, instance: &Value) -> bool {
        if shape.is_null() {
            return false;
        }
        match Self::target_of(instance) {
            Ok((target, _)) => self.get_or_create_proxy_type(shape, target).can_create(),
            Err(_) => false,
        }
    }

    pub fn create_as<S: DuckShape>(&self, instance: &Value) -> Result<S, DuckTypeError> {
        S::from_duck(S::create_cache().create(instance)?)
    }

    pub fn can_create_as<S: DuckShape>(&self, instance: &Value) -> bool {
        S::create_cache().can_create(instance)
    }
}

/// A Rust-side handle type bound to a shape.
///
/// Usually implemented with [`duck_shape!`](crate::duck_shape).
pub trait DuckShape: Sized {
    fn shape() -> TypeDescription;

    /// The shape's single-slot cache, shared by every use of the handle.
    fn create_cache() -> &'static CreateCache;

    /// Wraps a freshly created adapter (or data-copy snapshot).
    fn from_duck(value: Value) -> Result<Self, DuckTypeError>;
}

/// Declares a [`DuckShape`] handle type.
///
/// ```ignore
/// duck_shape!(pub Greeter => greeter_shape());
/// duck_shape!(copy pub Point => point_shape());
/// ```
///
/// The expression after `=>` yields the shape's `TypeDescription` and is
/// evaluated once. Live handles dereference to [`DuckProxy`]; `copy` handles
/// wrap the snapshot's [`StructValue`](crate::value::StructValue).
#[macro_export]
macro_rules! duck_shape {
    (@common $name:ident, $shape:expr) => {
        fn shape() -> $crate::types::TypeDescription {
            static SHAPE: ::std::sync::OnceLock<$crate::types::TypeDescription> =
                ::std::sync::OnceLock::new();
            *SHAPE.get_or_init(|| $shape)
        }

        fn create_cache() -> &'static $crate::duck::CreateCache {
            static CACHE: ::std::sync::OnceLock<$crate::duck::CreateCache> =
                ::std::sync::OnceLock::new();
            CACHE.get_or_init(|| {
                $crate::duck::CreateCache::new(<$name as $crate::duck::DuckShape>::shape())
            })
        }
    };
    (copy $vis:vis $name:ident => $shape:expr) => {
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name(pub $crate::value::StructValue);

        impl $crate::duck::DuckShape for $name {
            $crate::duck_shape!(@common $name, $shape);

            fn from_duck(
                value: $crate::value::Value,
            ) -> ::std::result::Result<Self, $crate::error::DuckTypeError> {
                match value {
                    $crate::value::Value::Struct(s) => Ok($name(s)),
                    other => Err($crate::error::RuntimeError::InvalidCast {
                        actual: format!("{:?}", other),
                        expected: <$name as $crate::duck::DuckShape>::shape().type_name(),
                    }
                    .into()),
                }
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::value::StructValue;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
    ($vis:vis $name:ident => $shape:expr) => {
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name(pub $crate::duck::DuckProxy);

        impl $crate::duck::DuckShape for $name {
            $crate::duck_shape!(@common $name, $shape);

            fn from_duck(
                value: $crate::value::Value,
            ) -> ::std::result::Result<Self, $crate::error::DuckTypeError> {
                $crate::duck::DuckProxy::new(value).map($name)
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::duck::DuckProxy;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

/// Conversions from arbitrary values to shapes.
pub trait DuckTypeExtensions {
    /// Adapts the value, failing on null or when no adapter can be built.
    fn duck_cast<S: DuckShape>(&self) -> Result<S, DuckTypeError>;

    /// Adapts the value; `Ok(None)` when it can't be adapted. Null is still
    /// an error.
    fn try_duck_cast<S: DuckShape>(&self) -> Result<Option<S>, DuckTypeError>;

    /// Adapts the value; `None` for null or on failure.
    fn duck_as<S: DuckShape>(&self) -> Option<S>;

    fn duck_is<S: DuckShape>(&self) -> bool;

    /// [`duck_cast`](Self::duck_cast) against a shape known only at runtime.
    fn duck_cast_to(&self, shape: TypeDescription) -> Result<Value, DuckTypeError>;

    fn duck_is_of(&self, shape: TypeDescription) -> bool;
}

impl DuckTypeExtensions for Value {
    fn duck_cast<S: DuckShape>(&self) -> Result<S, DuckTypeError> {
        DuckType::global().create_as::<S>(self)
    }

    fn try_duck_cast<S: DuckShape>(&self) -> Result<Option<S>, DuckTypeError> {
        let (target, instance) = DuckType::target_of(self)?;
        let result = S::create_cache().get_proxy(target);
        if !result.can_create() {
            return Ok(None);
        }
        S::from_duck(result.create_instance(instance)?).map(Some)
    }

    fn duck_as<S: DuckShape>(&self) -> Option<S> {
        self.try_duck_cast::<S>().ok().flatten()
    }

    fn duck_is<S: DuckShape>(&self) -> bool {
        !self.is_null() && S::create_cache().can_create(self)
    }

    fn duck_cast_to(&self, shape: TypeDescription) -> Result<Value, DuckTypeError> {
        DuckType::global().create(shape, self)
    }

    fn duck_is_of(&self, shape: TypeDescription) -> bool {
        DuckType::global().can_create(shape, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        builder::{PropertyBuilder, TypeBuilder},
        runtime::RuntimeType,
    };

    #[test]
    fn waiting_requests_count_as_hits() {
        let asm = AssemblyLoader::global().load_assembly("Duck.Tests.Contention");
        let shape = TypeBuilder::interface(asm, "Duck.Tests.Contention.IValue")
            .property(PropertyBuilder::new("Value", RuntimeType::Int32).readable())
            .build()
            .unwrap();
        let target = TypeBuilder::class(asm, "Duck.Tests.Contention.Target")
            .auto_property(PropertyBuilder::new("Value", RuntimeType::Int32))
            .build()
            .unwrap();

        let factory = DuckType::new(AssemblyLoader::global(), DuckTypeConfig::default());
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| assert!(factory.get_or_create_proxy_type(shape, target).can_create()));
            }
        });

        let stats = factory.stats();
        assert_eq!(stats.generations, 1);
        assert_eq!(stats.proxy_types.misses, 1);
        assert_eq!(stats.proxy_types.hits, 7);
    }
}
