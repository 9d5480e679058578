use crate::utils::env_flag;

pub const TRACE_ROUTINES_VAR: &str = "DUCKTYPE_TRACE_ROUTINES";
pub const STATS_VAR: &str = "DUCKTYPE_STATS";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuckTypeConfig {
    /// Log each synthesized routine's instruction listing at trace level.
    pub trace_routines: bool,
    pub collect_stats: bool,
}

impl Default for DuckTypeConfig {
    fn default() -> Self {
        Self {
            trace_routines: false,
            collect_stats: true,
        }
    }
}

impl DuckTypeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            trace_routines: env_flag(TRACE_ROUTINES_VAR).unwrap_or(defaults.trace_routines),
            collect_stats: env_flag(STATS_VAR).unwrap_or(defaults.collect_stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_collect_stats_without_tracing() {
        let config = DuckTypeConfig::default();
        assert!(config.collect_stats);
        assert!(!config.trace_routines);
    }
}
