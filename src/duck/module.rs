//! Code-generation arenas that adapter types are registered into.
use crate::{
    assemblies::{Assembly, AssemblyLoader},
    duck::{
        emit::{Invocable, TargetMember, Trampoline},
        metrics::DuckMetrics,
    },
    error::DuckTypeError,
    types::{access::AccessContext, TypeDescription},
    utils::sync::{Arc, AtomicUsize, Mutex, Ordering},
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

struct AccessGrants {
    assemblies: HashSet<String>,
    snapshot: Arc<[String]>,
}

impl Default for AccessGrants {
    fn default() -> Self {
        Self {
            assemblies: HashSet::new(),
            snapshot: Arc::from(Vec::new()),
        }
    }
}

/// A dynamic assembly plus the bookkeeping needed to reach into the
/// assemblies of the types adapted inside it.
pub struct ModuleBuilder {
    assembly: &'static Assembly,
    metrics: Arc<DuckMetrics>,
    grants: Mutex<AccessGrants>,
    trampolines: Mutex<HashMap<String, Arc<Trampoline>>>,
    type_count: AtomicUsize,
}

impl ModuleBuilder {
    fn new(assembly: &'static Assembly, metrics: Arc<DuckMetrics>) -> Self {
        Self {
            assembly,
            metrics,
            grants: Mutex::new(AccessGrants::default()),
            trampolines: Mutex::new(HashMap::new()),
            type_count: AtomicUsize::new(0),
        }
    }

    pub fn assembly(&self) -> &'static Assembly {
        self.assembly
    }

    /// Lets the module name `td` even if it is not public, by recording an
    /// "ignores access checks to" grant for its assembly.
    pub fn ensure_type_visibility(&self, td: TypeDescription) {
        if td.is_visible() || std::ptr::eq(td.assembly(), self.assembly) {
            return;
        }
        let name = &td.assembly().name;
        let mut grants = self.grants.lock();
        if grants.assemblies.insert(name.clone()) {
            let mut all: Vec<String> = grants.assemblies.iter().cloned().collect();
            all.sort();
            grants.snapshot = Arc::from(all);
            debug!("{} ignores access checks to {}", self.assembly.name, name);
        }
    }

    pub fn ignores_access_checks_to(&self) -> Arc<[String]> {
        self.grants.lock().snapshot.clone()
    }

    /// The context direct calls from this module's routines are checked in.
    pub fn access_context(&self) -> AccessContext {
        AccessContext::Assembly {
            assembly: self.assembly,
            ignores_access_checks_to: self.ignores_access_checks_to(),
        }
    }

    pub fn can_access_type(&self, td: TypeDescription) -> bool {
        self.access_context().can_access_type(td)
    }

    /// Public members of reachable types are called directly; anything else
    /// goes through a trampoline.
    pub fn can_call_directly(&self, target: &TargetMember) -> bool {
        target.accessibility().is_public() && self.can_access_type(target.declaring_type())
    }

    pub fn trampoline_for(&self, target: &TargetMember) -> Arc<Trampoline> {
        let key = format!("{:?}", target);
        let mut trampolines = self.trampolines.lock();
        let next = trampolines.len();
        trampolines
            .entry(key)
            .or_insert_with(|| {
                let name = format!("_duckTypeTrampoline{}", next);
                debug!("{} generated {} for {:?}", self.assembly.name, name, target);
                self.metrics.record_trampoline();
                Arc::new(Trampoline {
                    name,
                    target: target.clone(),
                })
            })
            .clone()
    }

    pub fn trampoline_count(&self) -> usize {
        self.trampolines.lock().len()
    }

    pub fn next_type_name(&self, shape: TypeDescription, target: TypeDescription) -> String {
        let n = self.type_count.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}.{}->{}_{}",
            self.assembly.name,
            target.type_name(),
            shape.type_name(),
            n
        )
    }
}

/// Hands out arenas: one shared arena per target assembly for visible
/// targets, a fresh one per non-visible target type.
pub struct ModuleRegistry {
    active: Mutex<HashMap<String, Arc<ModuleBuilder>>>,
    counter: AtomicUsize,
    metrics: Arc<DuckMetrics>,
}

impl ModuleRegistry {
    pub fn new(metrics: Arc<DuckMetrics>) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            counter: AtomicUsize::new(0),
            metrics,
        }
    }

    pub fn module_for(
        &self,
        loader: &AssemblyLoader,
        target: TypeDescription,
    ) -> Result<Arc<ModuleBuilder>, DuckTypeError> {
        if target.is_visible() {
            let mut active = self.active.lock();
            let key = target.assembly().name.clone();
            if let Some(module) = active.get(&key) {
                return Ok(module.clone());
            }
            let module = self.create(loader, &format!("DuckTypeAssembly.{}", key))?;
            active.insert(key, module.clone());
            Ok(module)
        } else {
            self.create(
                loader,
                &format!("DuckTypeNotVisibleAssembly.{}", target.name()),
            )
        }
    }

    fn create(&self, loader: &AssemblyLoader, base: &str) -> Result<Arc<ModuleBuilder>, DuckTypeError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let assembly = loader.define_dynamic_assembly(&format!("{}_{}", base, n))?;
        Ok(Arc::new(ModuleBuilder::new(assembly, self.metrics.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::builder::TypeBuilder;

    #[test]
    fn visible_targets_share_an_arena() {
        let loader = AssemblyLoader::global();
        let registry = ModuleRegistry::new(Arc::new(DuckMetrics::default()));
        let asm = loader.load_assembly("Module.Tests.Shared");
        let a = TypeBuilder::class(asm, "Module.Tests.Shared.A").build().unwrap();
        let b = TypeBuilder::class(asm, "Module.Tests.Shared.B").build().unwrap();

        let ma = registry.module_for(loader, a).unwrap();
        let mb = registry.module_for(loader, b).unwrap();
        assert!(Arc::ptr_eq(&ma, &mb));
        assert!(ma.assembly().is_dynamic);
    }

    #[test]
    fn hidden_targets_get_their_own_arena_and_grant() {
        let loader = AssemblyLoader::global();
        let registry = ModuleRegistry::new(Arc::new(DuckMetrics::default()));
        let asm = loader.load_assembly("Module.Tests.Hidden");
        let hidden = TypeBuilder::class(asm, "Module.Tests.Hidden.Secret")
            .internal()
            .build()
            .unwrap();

        let first = registry.module_for(loader, hidden).unwrap();
        let second = registry.module_for(loader, hidden).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        assert!(!first.can_access_type(hidden));
        first.ensure_type_visibility(hidden);
        first.ensure_type_visibility(hidden);
        assert_eq!(&*first.ignores_access_checks_to(), &["Module.Tests.Hidden".to_string()]);
        assert!(first.can_access_type(hidden));
    }
}
