//! Application layer: services and use cases
//!
//! This layer loads documents through the I/O boundary traits and hands
//! them to the domain resolver.

pub mod error;
pub mod error_ext;
pub mod services;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::{DocumentResultExt, IoResultExt};
