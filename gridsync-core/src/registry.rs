//! YAML registry for projects and grid configurations.
//!
//! # Storage layout
//!
//! ```text
//! ~/.gridsync/
//!   settings.yaml
//!   projects/
//!     <project_id>.yaml     (mode 0600)
//!   configs/
//!     <config_id>.yaml      (mode 0600, holds the API key)
//! ```
//!
//! # API pattern
//!
//! Every function takes an explicit `home: &Path` (`fn_at`) so tests can use
//! a `TempDir`. [`home`] resolves the real home directory for binaries.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{registry_io, RegistryError};
use crate::types::{ConfigId, GridConfig, Project, ProjectId};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.gridsync/`: pure, no I/O.
pub fn root_at(home: &Path) -> PathBuf {
    home.join(".gridsync")
}

/// `<home>/.gridsync/projects/<id>.yaml`: no I/O. Fails with
/// `RegistryError::InvalidId` unless `id` is already a slug.
pub fn project_path_at(home: &Path, id: &ProjectId) -> Result<PathBuf, RegistryError> {
    Ok(root_at(home).join("projects").join(file_name(&id.0)?))
}

/// `<home>/.gridsync/configs/<id>.yaml`: no I/O, same id rule as projects.
pub fn config_path_at(home: &Path, id: &ConfigId) -> Result<PathBuf, RegistryError> {
    Ok(root_at(home).join("configs").join(file_name(&id.0)?))
}

/// Ids name files directly, so anything but a slug (`../x`, `a/b`, `Site`)
/// is refused.
fn file_name(id: &str) -> Result<String, RegistryError> {
    if id.is_empty() || slugify(id) != id {
        return Err(RegistryError::InvalidId(id.to_string()));
    }
    Ok(format!("{id}.yaml"))
}

/// Lowercase ASCII slug: runs of non-alphanumerics collapse to one `-`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Registry id derived from a display name.
pub fn id_for_name(name: &str) -> Result<String, RegistryError> {
    let id = slugify(name);
    if id.is_empty() {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(id)
}

// ---------------------------------------------------------------------------
// 2. Projects
// ---------------------------------------------------------------------------

/// Returns `RegistryError::NotFound` if absent,
/// `RegistryError::Parse` (with path + line context) if malformed YAML.
pub fn load_project_at(home: &Path, id: &ProjectId) -> Result<Project, RegistryError> {
    load_yaml(&project_path_at(home, id)?)
}

/// All projects, sorted by id.
pub fn list_projects_at(home: &Path) -> Result<Vec<Project>, RegistryError> {
    let mut projects: Vec<Project> = list_yaml(&root_at(home).join("projects"))?;
    projects.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(projects)
}

/// Atomically write a project (create or replace).
pub fn save_project_at(home: &Path, project: &Project) -> Result<(), RegistryError> {
    save_yaml(&project_path_at(home, &project.id)?, project)
}

/// Write a new project; fails with `AlreadyExists` if the id is taken.
pub fn insert_project_at(home: &Path, project: &Project) -> Result<(), RegistryError> {
    let path = project_path_at(home, &project.id)?;
    if path.exists() {
        return Err(RegistryError::AlreadyExists { path });
    }
    save_yaml(&path, project)
}

pub fn delete_project_at(home: &Path, id: &ProjectId) -> Result<(), RegistryError> {
    remove(&project_path_at(home, id)?)
}

// ---------------------------------------------------------------------------
// 3. Grid configurations
// ---------------------------------------------------------------------------

pub fn load_config_at(home: &Path, id: &ConfigId) -> Result<GridConfig, RegistryError> {
    load_yaml(&config_path_at(home, id)?)
}

/// All configurations, sorted by id.
pub fn list_configs_at(home: &Path) -> Result<Vec<GridConfig>, RegistryError> {
    let mut configs: Vec<GridConfig> = list_yaml(&root_at(home).join("configs"))?;
    configs.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(configs)
}

pub fn save_config_at(home: &Path, config: &GridConfig) -> Result<(), RegistryError> {
    save_yaml(&config_path_at(home, &config.id)?, config)
}

pub fn insert_config_at(home: &Path, config: &GridConfig) -> Result<(), RegistryError> {
    let path = config_path_at(home, &config.id)?;
    if path.exists() {
        return Err(RegistryError::AlreadyExists { path });
    }
    save_yaml(&path, config)
}

pub fn delete_config_at(home: &Path, id: &ConfigId) -> Result<(), RegistryError> {
    remove(&config_path_at(home, id)?)
}

/// First active configuration in id order.
pub fn first_active_config_at(home: &Path) -> Result<Option<GridConfig>, RegistryError> {
    Ok(list_configs_at(home)?.into_iter().find(|c| c.is_active))
}

// ---------------------------------------------------------------------------
// 4. Home
// ---------------------------------------------------------------------------

/// The user's home directory from `dirs::home_dir()`.
pub fn home() -> Result<PathBuf, RegistryError> {
    dirs::home_dir().ok_or(RegistryError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn load_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, RegistryError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(RegistryError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(registry_io(path, err)),
    };
    serde_yaml::from_str(&contents).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn list_yaml<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, RegistryError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| registry_io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|x| x == "yaml").unwrap_or(false))
        .collect();
    paths.sort();
    paths.iter().map(|p| load_yaml(p)).collect()
}

/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), RegistryError> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| registry_io(dir, e))?;
            set_dir_permissions(dir)?;
        }
    }
    let yaml = serde_yaml::to_string(value)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| registry_io(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, path).map_err(|e| registry_io(path, e))
}

fn remove(path: &Path) -> Result<(), RegistryError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(RegistryError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(registry_io(path, err)),
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| registry_io(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), RegistryError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| registry_io(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), RegistryError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
