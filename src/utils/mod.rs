//! Utility types and functions used throughout the codebase.
use std::fmt::{Debug, Formatter};

pub mod sync;

pub struct DebugStr(pub String);

impl Debug for DebugStr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Moves a definition onto the heap for the rest of the process.
///
/// Type and member definitions are never unloaded, so handles to them can be
/// plain `&'static` references compared by address.
pub fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// Reads a boolean switch from the environment.
///
/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
/// Returns `None` if the variable is unset or unparseable.
pub fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaked_values_keep_identity() {
        let a = leak(5u32);
        let b = leak(5u32);
        assert!(!std::ptr::eq(a, b));
        assert_eq!(*a, *b);
    }

    #[test]
    fn unset_flag_is_none() {
        assert_eq!(env_flag("DOTNET_DUCK_SURELY_UNSET_VARIABLE"), None);
    }
}
