use crate::{
    duck::{proxy::ProxyType, DuckType},
    error::DuckTypeError,
    types::TypeDescription,
    utils::sync::{Arc, RwLock},
    value::Value,
};
use tracing::trace;

/// The outcome of generating an adapter for one (shape, target) pair.
///
/// Failures are kept and handed back on every later request for the pair.
#[derive(Debug)]
pub struct CreateTypeResult {
    pub shape: TypeDescription,
    pub target: TypeDescription,
    proxy: Result<Arc<ProxyType>, DuckTypeError>,
}

impl CreateTypeResult {
    pub(crate) fn new(
        shape: TypeDescription,
        target: TypeDescription,
        proxy: Result<Arc<ProxyType>, DuckTypeError>,
    ) -> Self {
        Self {
            shape,
            target,
            proxy,
        }
    }

    pub fn can_create(&self) -> bool {
        self.proxy.is_ok()
    }

    pub fn error(&self) -> Option<&DuckTypeError> {
        self.proxy.as_ref().err()
    }

    pub fn proxy_type(&self) -> Result<&Arc<ProxyType>, DuckTypeError> {
        self.proxy.as_ref().map_err(Clone::clone)
    }

    /// Wraps `instance` in a new adapter, or replays the generation failure.
    pub fn create_instance(&self, instance: Value) -> Result<Value, DuckTypeError> {
        self.proxy_type()?.create_instance(instance)
    }
}

/// Single-slot cache in front of the factory for one fixed shape.
///
/// Remembers the last target type seen, so call sites that always adapt the
/// same type skip the type-pair map.
pub struct CreateCache {
    shape: TypeDescription,
    last: RwLock<Option<(TypeDescription, Arc<CreateTypeResult>)>>,
}

impl CreateCache {
    pub fn new(shape: TypeDescription) -> Self {
        Self {
            shape,
            last: RwLock::new(None),
        }
    }

    pub fn shape(&self) -> TypeDescription {
        self.shape
    }

    pub fn get_proxy(&self, target: TypeDescription) -> Arc<CreateTypeResult> {
        let factory = DuckType::global();
        if let Some((seen, result)) = &*self.last.read() {
            if *seen == target {
                factory.metrics().record_fast_path_hit();
                trace!("fast path hit for {:?} over {:?}", self.shape, target);
                return result.clone();
            }
        }
        factory.metrics().record_fast_path_miss();
        let result = factory.get_or_create_proxy_type(self.shape, target);
        *self.last.write() = Some((target, result.clone()));
        result
    }

    pub fn create(&self, instance: &Value) -> Result<Value, DuckTypeError> {
        let (target, instance) = DuckType::target_of(instance)?;
        self.get_proxy(target).create_instance(instance)
    }

    pub fn can_create(&self, instance: &Value) -> bool {
        match DuckType::target_of(instance) {
            Ok((target, _)) => self.get_proxy(target).can_create(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for CreateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateCache")
            .field("shape", &self.shape)
            .field("last", &self.last.read().as_ref().map(|(t, _)| *t))
            .finish()
    }
}
