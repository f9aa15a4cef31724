//! Core types for secretkit
//!
//! This crate provides the error taxonomy and the per-call request context
//! shared by every secret operation.

pub mod context;
pub mod error;

pub use context::RequestContext;
pub use error::{BoxError, Error, ErrorKind, Result};
