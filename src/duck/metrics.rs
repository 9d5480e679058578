use crate::utils::sync::{AtomicBool, AtomicU64, Ordering};
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Type-pair cache.
    pub proxy_types: CacheStat,
    /// Single-slot per-shape caches.
    pub fast_path: CacheStat,
    /// Loader name lookups.
    pub assembly_type: CacheStat,
    pub generations: u64,
    pub generation_failures: u64,
    pub trampolines: u64,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Duck Type Statistics:")?;
        writeln!(f, "  Proxy Type Cache:       {}", self.proxy_types)?;
        writeln!(f, "  Fast Path Cache:        {}", self.fast_path)?;
        writeln!(f, "  Assembly Type Cache:    {}", self.assembly_type)?;
        writeln!(f, "  Generations:            {:>8}", self.generations)?;
        writeln!(f, "  Generation Failures:    {:>8}", self.generation_failures)?;
        writeln!(f, "  Trampolines:            {:>8}", self.trampolines)?;
        Ok(())
    }
}

impl std::fmt::Display for CacheStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%, size: {:>8}",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.size
        )
    }
}

/// Factory counters.
///
/// All counters use `Ordering::Relaxed`: they are independent and only need
/// to be updated atomically. When collection is disabled every `record_*`
/// call is a no-op.
#[derive(Debug)]
pub struct DuckMetrics {
    enabled: AtomicBool,
    pub proxy_cache_hits: AtomicU64,
    pub proxy_cache_misses: AtomicU64,
    pub fast_path_hits: AtomicU64,
    pub fast_path_misses: AtomicU64,
    pub generations: AtomicU64,
    pub generation_failures: AtomicU64,
    pub trampolines: AtomicU64,
}

impl DuckMetrics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            proxy_cache_hits: AtomicU64::new(0),
            proxy_cache_misses: AtomicU64::new(0),
            fast_path_hits: AtomicU64::new(0),
            fast_path_misses: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            generation_failures: AtomicU64::new(0),
            trampolines: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    #[inline]
    fn bump(&self, counter: &AtomicU64) {
        if self.is_enabled() {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_proxy_cache_hit(&self) {
        self.bump(&self.proxy_cache_hits);
    }

    #[inline]
    pub fn record_proxy_cache_miss(&self) {
        self.bump(&self.proxy_cache_misses);
    }

    #[inline]
    pub fn record_fast_path_hit(&self) {
        self.bump(&self.fast_path_hits);
    }

    #[inline]
    pub fn record_fast_path_miss(&self) {
        self.bump(&self.fast_path_misses);
    }

    pub fn record_generation(&self, succeeded: bool) {
        self.bump(&self.generations);
        if !succeeded {
            self.bump(&self.generation_failures);
        }
    }

    pub fn record_trampoline(&self) {
        self.bump(&self.trampolines);
    }

    pub fn cache_statistics(&self, proxy_cache_size: usize, assembly_type: (u64, u64, usize)) -> CacheStats {
        let fast_hits = self.fast_path_hits.load(Ordering::Relaxed);
        let fast_misses = self.fast_path_misses.load(Ordering::Relaxed);
        CacheStats {
            proxy_types: self.stat(
                self.proxy_cache_hits.load(Ordering::Relaxed),
                self.proxy_cache_misses.load(Ordering::Relaxed),
                proxy_cache_size,
            ),
            fast_path: self.stat(fast_hits, fast_misses, 0),
            assembly_type: self.stat(assembly_type.0, assembly_type.1, assembly_type.2),
            generations: self.generations.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            trampolines: self.trampolines.load(Ordering::Relaxed),
        }
    }

    fn stat(&self, hits: u64, misses: u64, size: usize) -> CacheStat {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        CacheStat {
            hits,
            misses,
            hit_rate,
            size,
        }
    }
}

impl Default for DuckMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_metrics_stay_at_zero() {
        let metrics = DuckMetrics::new(false);
        metrics.record_proxy_cache_hit();
        metrics.record_generation(false);
        let stats = metrics.cache_statistics(3, (0, 0, 0));
        assert_eq!(stats.proxy_types.hits, 0);
        assert_eq!(stats.generation_failures, 0);
        assert_eq!(stats.proxy_types.size, 3);
    }

    #[test]
    fn hit_rate_is_computed() {
        let metrics = DuckMetrics::new(true);
        metrics.record_proxy_cache_hit();
        metrics.record_proxy_cache_hit();
        metrics.record_proxy_cache_hit();
        metrics.record_proxy_cache_miss();
        metrics.record_generation(false);
        let stats = metrics.cache_statistics(1, (0, 0, 0));
        assert_eq!(stats.proxy_types.hit_rate, 0.75);
        assert_eq!(stats.generations, 1);
        assert_eq!(stats.generation_failures, 1);
        assert!(stats.to_string().contains("Proxy Type Cache"));
    }
}
