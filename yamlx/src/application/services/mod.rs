//! Application services
//!
//! Services sit between the CLI and the domain resolver.

pub mod document;

pub use document::{DocumentFormat, DocumentService};
