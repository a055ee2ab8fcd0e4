//! Resolve `${variable}` references and arithmetic inside configuration trees.
//!
//! A string leaf such as `"${server.port} + 1"` is parsed, its variables are
//! looked up in the same (unmodified) document, and the leaf is replaced by
//! the computed number:
//!
//! ```
//! use yamlx::{resolve, Value};
//!
//! let doc: Value = serde_yaml::from_str("a: 2\nb: ${a} + 3\n").unwrap();
//! let out = resolve(&doc).unwrap();
//! assert_eq!(out.child("b"), Some(&Value::Float(5.0)));
//! ```

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use domain::{resolve, DomainError, DomainResult, ResolveOptions, Resolver, Value};
