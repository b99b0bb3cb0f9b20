//! # gridsync-grid
//!
//! Remote grid client: wire types, the [`GridApi`] seam, a blocking HTTP
//! implementation and an in-memory [`FakeGrid`].
//!
//! Engines obtain a view-bound [`GridApi`] from a [`Connect`] implementation
//! so the transport can be swapped without touching sync logic.

pub mod client;
pub mod error;
pub mod fake;
pub mod http;
pub mod wire;

pub use client::{validate_config, Connect, GridApi};
pub use error::{extract_message, GridError};
pub use fake::{Call, FakeGrid, Op};
pub use http::{HttpConnector, HttpGridClient};
pub use wire::{
    Cell, Column, Dependency, DependencyStatus, LanguageColumn, LocalizationType, MetadataColumn,
    NewColumn, Record, View,
};
