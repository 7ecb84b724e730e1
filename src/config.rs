//! Run configuration loaded from a TOML file.
//!
//! Every section is optional; missing keys take the defaults below, while
//! unknown keys are rejected so typos surface instead of being ignored.
//!
//! ```toml
//! [archive]
//! base_url = "https://www.sec.state.ma.us/AppealsWeb/Download.aspx?DownloadPath="
//! id_width = 5
//!
//! [storage]
//! download_dir = "/srv/public_records/downloads/appeals"
//! sidecar = true
//!
//! [[formats]]
//! media_type = "application/pdf"
//! extension = "pdf"
//! kind = "pdf"
//! ```

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::classify::{AllowList, AllowListError, AllowedFormat, ClassifierConfig, MediaType};
use crate::classify::sniff::{MODERN_WORD, PDF};
use crate::convert::{DEFAULT_CONVERTER_PROGRAM, DEFAULT_TARGET_FORMAT, SofficeConverter};
use crate::fetch::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::metadata::FormatKind;

/// Directory name under the user config directory.
const APP_DIR: &str = "prkeeper";

/// Default archive endpoint; the padded document number is appended.
pub const DEFAULT_BASE_URL: &str =
    "https://www.sec.state.ma.us/AppealsWeb/Download.aspx?DownloadPath=";

/// Default directory for accepted documents.
pub const DEFAULT_DOWNLOAD_DIR: &str = "/srv/public_records/downloads/appeals";

/// Default number of consecutive misses before enumeration stops.
pub const DEFAULT_MAX_CONSECUTIVE_MISSES: u32 = 10;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid config value for `{field}`: {message}")]
    Invalid {
        /// Dotted key of the offending value.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The `[[formats]]` table is inconsistent.
    #[error("invalid `formats` table: {0}")]
    AllowList(#[from] AllowListError),
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Remote archive settings.
    pub archive: ArchiveConfig,
    /// Local storage settings.
    pub storage: StorageConfig,
    /// Legacy converter settings.
    pub converter: ConverterConfig,
    /// Enumeration stopping rules.
    pub enumeration: EnumerationConfig,
    /// Accepted formats. Replaces the defaults when present.
    pub formats: Vec<FormatEntry>,
}

/// `[archive]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// URL prefix the padded document number is appended to.
    pub base_url: String,
    /// Zero-padding width of document numbers.
    pub id_width: usize,
    /// HTTP connect timeout.
    pub connect_timeout_secs: u64,
    /// HTTP request timeout.
    pub read_timeout_secs: u64,
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Where accepted documents are persisted.
    pub download_dir: PathBuf,
    /// Scratch directory; a fresh temporary directory when unset.
    pub scratch_dir: Option<PathBuf>,
    /// Write a JSON sidecar next to each persisted document.
    pub sidecar: bool,
}

/// `[converter]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Converter executable.
    pub program: PathBuf,
    /// Format passed to `--convert-to`.
    pub target_format: String,
}

/// `[enumeration]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumerationConfig {
    /// Consecutive missing documents tolerated before stopping.
    pub max_consecutive_misses: u32,
}

/// One `[[formats]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatEntry {
    /// Sniffed media type.
    pub media_type: String,
    /// Extension for persisted files.
    pub extension: String,
    /// Metadata reader.
    pub kind: FormatKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive: ArchiveConfig::default(),
            storage: StorageConfig::default(),
            converter: ConverterConfig::default(),
            enumeration: EnumerationConfig::default(),
            formats: vec![
                FormatEntry {
                    media_type: PDF.to_string(),
                    extension: "pdf".to_string(),
                    kind: FormatKind::Pdf,
                },
                FormatEntry {
                    media_type: MODERN_WORD.to_string(),
                    extension: "docx".to_string(),
                    kind: FormatKind::ModernDoc,
                },
            ],
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            id_width: crate::classify::DEFAULT_ID_WIDTH,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            scratch_dir: None,
            sidecar: false,
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_CONVERTER_PROGRAM),
            target_format: DEFAULT_TARGET_FORMAT.to_string(),
        }
    }
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            max_consecutive_misses: DEFAULT_MAX_CONSECUTIVE_MISSES,
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] (with `path` for context) or a
    /// validation error.
    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.archive.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::invalid("archive.base_url", "must not be empty"));
        }
        if Url::parse(base_url).is_err() {
            return Err(ConfigError::invalid(
                "archive.base_url",
                format!("{base_url:?} is not a valid URL"),
            ));
        }
        if !(1..=12).contains(&self.archive.id_width) {
            return Err(ConfigError::invalid(
                "archive.id_width",
                format!("{}. Expected range: 1..=12", self.archive.id_width),
            ));
        }
        validate_timeout_secs("archive.connect_timeout_secs", self.archive.connect_timeout_secs)?;
        validate_timeout_secs("archive.read_timeout_secs", self.archive.read_timeout_secs)?;

        if self.enumeration.max_consecutive_misses == 0 {
            return Err(ConfigError::invalid(
                "enumeration.max_consecutive_misses",
                "must be at least 1",
            ));
        }
        if self.converter.program.as_os_str().is_empty() {
            return Err(ConfigError::invalid("converter.program", "must not be empty"));
        }
        let target = self.converter.target_format.trim();
        if target.is_empty() || target.contains(['/', '\\']) {
            return Err(ConfigError::invalid(
                "converter.target_format",
                format!("{target:?} is not a format name"),
            ));
        }

        self.allow_list()?;
        Ok(())
    }

    /// Builds the allow-list from `[[formats]]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AllowList`] for inconsistent entries.
    pub fn allow_list(&self) -> Result<AllowList, ConfigError> {
        let entries = self.formats.iter().map(|entry| {
            (
                MediaType::new(entry.media_type.trim()),
                AllowedFormat::new(entry.extension.clone(), entry.kind),
            )
        });
        Ok(AllowList::from_entries(entries)?)
    }

    /// Builds the classifier settings.
    ///
    /// # Errors
    ///
    /// Same as [`allow_list`](Self::allow_list).
    pub fn classifier_config(&self) -> Result<ClassifierConfig, ConfigError> {
        Ok(ClassifierConfig {
            allow_list: self.allow_list()?,
        })
    }

    /// Builds the legacy converter.
    #[must_use]
    pub fn converter(&self) -> SofficeConverter {
        SofficeConverter::new(
            self.converter.program.clone(),
            self.converter.target_format.trim(),
        )
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if !(1..=3600).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: 1..=3600"),
        ));
    }
    Ok(())
}

/// Loaded config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path consulted, if any.
    pub path: Option<PathBuf>,
    /// Effective configuration.
    pub config: Config,
    /// Whether `config` was read from disk.
    pub loaded_from_file: bool,
}

/// Loads an explicit config file, or the default one if it exists, or the
/// built-in defaults.
///
/// # Errors
///
/// An explicit path that cannot be read is an error; a missing default file
/// is not.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        let config = Config::load(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = Config::load(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => {
            debug!(path = ?path, "no config file; using defaults");
            Ok(LoadedConfig {
                path,
                config: Config::default(),
                loaded_from_file: false,
            })
        }
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/prkeeper/config.toml`
/// 2. `$HOME/.config/prkeeper/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    default_config_path_from(
        env_var_non_empty_os("XDG_CONFIG_HOME"),
        env_var_non_empty_os("HOME"),
    )
}

fn default_config_path_from(
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Option<PathBuf> {
    if let Some(xdg_config_home) = xdg_config_home {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }
    let home = home?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
