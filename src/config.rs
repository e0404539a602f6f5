use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use crate::error::{CcscanError, Result};

fn default_allowed_extensions() -> String {
    "ts".to_string()
}

fn default_allowed_mimetypes() -> Vec<String> {
    vec!["video".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Settings used by every library without its own entry
    #[serde(default)]
    pub settings: Settings,
    /// Per-library overrides keyed by library id
    #[serde(default)]
    pub libraries: BTreeMap<String, Settings>,
    pub probe: ProbeConfig,
    pub extractor: ExtractorConfig,
    pub profile: ProfileConfig,
}

/// Plugin settings persisted per library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Only run when the original source file matches `allowed_extensions`
    #[serde(default)]
    pub limit_to_extensions: bool,
    /// Comma separated list of file extensions
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: String,
}

/// Description of one settings form field as a host UI would render it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Path to ffprobe binary
    pub binary_path: String,
    /// Mimetype families accepted for probing (e.g. "video")
    #[serde(default = "default_allowed_mimetypes")]
    pub allowed_mimetypes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to ccextractor binary
    pub binary_path: String,
    /// Additional arguments placed before the input path
    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Root of the per-library profile directories holding lock files
    pub directory: PathBuf,
    /// How the lock file is used when a file is dispatched
    #[serde(default)]
    pub lock_mode: LockMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Write the lock file after dispatch and never read it back
    #[default]
    Marker,
    /// Claim the lock file with exclusive creation before dispatch; skip when it exists
    Exclusive,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limit_to_extensions: false,
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Settings {
    /// Form fields for the settings UI. The extension list is hidden while
    /// extension limiting is switched off.
    pub fn form_fields(&self) -> Vec<FormField> {
        vec![
            FormField {
                key: "limit_to_extensions",
                label: "Only run when the original source file matches specified extensions",
                hidden: false,
            },
            FormField {
                key: "allowed_extensions",
                label: "Comma separated list of file extensions",
                hidden: !self.limit_to_extensions,
            },
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            libraries: BTreeMap::new(),
            probe: ProbeConfig {
                binary_path: "ffprobe".to_string(),
                allowed_mimetypes: default_allowed_mimetypes(),
            },
            extractor: ExtractorConfig {
                binary_path: "ccextractor".to_string(),
                extra_args: vec![],
            },
            profile: ProfileConfig {
                directory: PathBuf::from(".ccscan").join("profile"),
                lock_mode: LockMode::Marker,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CcscanError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CcscanError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| CcscanError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Settings for a library, falling back to the global section
    pub fn settings_for(&self, library_id: u64) -> Settings {
        self.libraries
            .get(&library_id.to_string())
            .cloned()
            .unwrap_or_else(|| self.settings.clone())
    }

    /// Profile directory holding the lock files of one library
    pub fn profile_directory(&self, library_id: u64) -> PathBuf {
        self.profile.directory.join(format!("library-{}", library_id))
    }
}
