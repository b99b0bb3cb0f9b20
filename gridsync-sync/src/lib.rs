//! # gridsync-sync
//!
//! The synchronization and reconciliation engine.
//!
//! - [`codec`]: entries ↔ grid records
//! - [`provision`]: metadata/language columns and dependency edges
//! - [`push`]: batched upload
//! - [`diff`]: which selected items need pushing
//! - [`pull`]: pagination and progress
//! - [`import`]: translations back into the content store
//!
//! [`Engine`] ties them to the project registry and is the entrypoint shared
//! by the CLI and the daemon.

pub mod codec;
pub mod diff;
pub mod engine;
pub mod error;
pub mod import;
pub mod provision;
pub mod pull;
pub mod push;

pub use diff::{ChangeReason, DiffReport, FieldChange, ItemDiff, SkipReason};
pub use engine::{
    ConfigUpdate, Engine, NewConfig, NewProject, ProjectUpdate, SyncMode, SyncOutcome,
};
pub use error::{ErrorReport, SyncError};
pub use import::{ImportOutcome, ImportReport, LocaleResult};
pub use provision::SchemaReport;
pub use pull::{LanguageProgress, ProgressReport};
pub use push::PushReport;
