//! Configuration snapshot and engine options
//!
//! `Configuration` is owned by the external settings store and arrives as a
//! whole snapshot. `EngineOptions` covers the knobs the store never sees.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, StoreError};
use super::types::{Group, PatternKind};

/// Element id of the engine's own injected UI host
pub const DEFAULT_HOST_ID: &str = "ink-shadow-host";

/// Quiet window before a batch of structural changes is rescanned
pub const DEFAULT_QUIET_WINDOW_MS: u64 = 300;

// =============================================================================
// Configuration (store snapshot)
// =============================================================================

/// Snapshot of the user's groups and global matching flags
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_true")]
    pub process_dynamic_content: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            groups: vec![
                Group::new(
                    "default-tech",
                    "Tech Keywords",
                    "#A7F3D0",
                    PatternKind::Literal,
                    &["Java", "Python", "React", "TypeScript", "Node.js"],
                ),
                Group::new(
                    "default-email",
                    "Emails",
                    "#FDE68A",
                    PatternKind::Regex,
                    &[r"[\w.]+@[\w.]+\.\w+"],
                ),
            ],
            case_sensitive: false,
            process_dynamic_content: true,
        }
    }
}

impl Configuration {
    /// Parse a snapshot as delivered by the store
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn enabled_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| g.enabled)
    }
}

/// The external settings store, seen only through its load interface.
///
/// Change notifications carry no payload; the engine reloads the whole
/// snapshot through this trait when told something changed.
pub trait ConfigurationStore {
    fn load(&self) -> Result<Configuration, StoreError>;
}

impl<F> ConfigurationStore for F
where
    F: Fn() -> Result<Configuration, StoreError>,
{
    fn load(&self) -> Result<Configuration, StoreError> {
        self()
    }
}

// =============================================================================
// Engine Options
// =============================================================================

/// Engine-side settings that are not part of the user's configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    /// Debounce interval for structural changes
    #[serde(default = "default_quiet_window")]
    pub quiet_window_ms: u64,
    /// Element id of the engine's own UI subtree, never scanned
    #[serde(default = "default_host_id")]
    pub host_id: String,
    /// Skip text under `aria-hidden="true"` ancestors.
    ///
    /// Some host documents mark the visible copy of a label aria-hidden and
    /// keep a screen-reader-only twin elsewhere, so this is off by default.
    #[serde(default)]
    pub skip_aria_hidden: bool,
}

fn default_quiet_window() -> u64 {
    DEFAULT_QUIET_WINDOW_MS
}

fn default_host_id() -> String {
    DEFAULT_HOST_ID.to_string()
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            quiet_window_ms: DEFAULT_QUIET_WINDOW_MS,
            host_id: DEFAULT_HOST_ID.to_string(),
            skip_aria_hidden: false,
        }
    }
}
