//! # Tracelet Schema
//!
//! Event schema files and the artifacts generated from them: CTF metadata
//! for trace viewers and Rust payload types for producers.

pub mod codegen;
pub mod ctf;
pub mod error;
pub mod schema;

pub use error::SchemaError;
pub use schema::{EventDef, Field, FieldValue, ParamDef, ParamType, Schema};
