//! Structural duck typing over a reflective object model.
//!
//! The [`types`] and [`assemblies`] modules model a managed type system:
//! assemblies holding classes, interfaces, structs and enums with fields,
//! properties and methods at every visibility level, plus native method
//! bodies. On top of it, [`duck`] synthesizes adapter types that let code
//! written against a shape drive any structurally compatible object.
pub mod assemblies;
pub mod duck;
pub mod error;
pub mod types;
pub mod utils;
pub mod value;

pub use assemblies::AssemblyLoader;
pub use duck::{DuckProxy, DuckShape, DuckType, DuckTypeExtensions};
pub use error::{DuckTypeError, RuntimeError, TypeResolutionError};
pub use types::{runtime::RuntimeType, TypeDescription};
pub use value::Value;
