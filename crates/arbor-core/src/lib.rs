//! Core types and trait definitions for the Arbor temporal graph.
//!
//! This crate is deliberately free of database and CLI dependencies;
//! everything else in the workspace depends on it.

pub mod connection;
pub mod context;
pub mod date;
pub mod error;
pub mod overlap;
pub mod span;
pub mod store;

pub use error::{Error, Result};
