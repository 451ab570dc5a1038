//! Core types and shared functionality for tabula.
//!
//! This crate provides:
//! - Unified error types
//! - Configuration structures
//! - The field mapping schema and the table it produces

pub mod config;
pub mod error;
pub mod mapping;
pub mod table;

pub use config::{AppConfig, ConfigError, RatingConfig, RatingFailure};
pub use error::Error;
pub use mapping::{ColumnSpec, FieldMapping, TagKind, relative_path};
pub use table::{Cell, Row, Table, TableSink};
