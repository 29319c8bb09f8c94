//! Common utilities for docbind
//!
//! This crate provides the error type shared by the mapper and the MongoDB layer.

pub mod error;

pub use error::{DocbindError, Result};
