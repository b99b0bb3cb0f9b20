//! gridsync core library: domain types, registry persistence, content store, settings.
//!
//! - [`types`]: newtypes, projects, grid configurations, content references
//! - [`content`]: entries, schemas and the [`ContentStore`] seam
//! - [`registry`]: YAML persistence for projects and grid configurations
//! - [`settings`]: `~/.gridsync/settings.yaml`
//! - [`policy`]: the overridable field-name policy table

pub mod content;
pub mod error;
pub mod policy;
pub mod registry;
pub mod settings;
pub mod types;

pub use content::{
    fs::FsContentStore, memory::MemoryContentStore, Attribute, ContentSchema, ContentStore, Entry,
    Locale, NewEntry, Visibility,
};
pub use error::{RegistryError, SettingsError, StoreError};
pub use policy::FieldPolicy;
pub use settings::Settings;
pub use types::{
    ConfigId, ContentRef, ContentType, EntryId, GridConfig, ImportStatus, Project, ProjectId,
    Subproject, SyncStatus,
};
