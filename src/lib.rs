//! Load a JSON dataset, then filter, group, sort and aggregate it.
//!
//! The engine is a set of pure functions ([`filter`], [`group`], [`sort`],
//! [`statistics`], [`export`]) driven by an explicit [`store::QueryState`]
//! that only changes through [`store::reduce`]. [`pipeline::derive_view`]
//! runs the engine for one state snapshot.

pub mod calc;
pub mod catalog;
pub mod config;
pub mod export;
pub mod filter;
pub mod group;
pub mod options;
pub mod pipeline;
pub mod schema;
pub mod sort;
pub mod source;
pub mod statistics;
pub mod store;
pub mod value;

pub use config::{AppConfig, ConfigManager};
pub use jsonquery_cli::{Args, CompressionFormat, ExportFormat};
pub use options::QueryOptions;
pub use pipeline::{derive_view, View};
pub use schema::{FieldType, Record, Schema};
pub use store::{Action, QueryState, Store};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "jsonquery";
