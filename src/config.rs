//! Category rule configuration.
//!
//! This module loads the category rules that drive organization. A
//! configuration lists categories, the extensions each one claims, an
//! optional global dry-run switch and exclusion rules for files that must
//! never be moved.
//!
//! # Configuration File Format
//!
//! Configuration is read as JSON, or as TOML when the file name ends in
//! `.toml`. Both carry the same structure:
//!
//! ```json
//! {
//!   "dry_run": false,
//!   "categories": [
//!     { "name": "Documents", "enabled": true, "extensions": [".pdf", ".txt"] },
//!     { "name": "Images", "enabled": true, "extensions": [".png", ".jpg"] }
//!   ],
//!   "exclude": {
//!     "filenames": ["desktop.ini"],
//!     "patterns": ["*.part"],
//!     "regex": []
//!   }
//! }
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "categories.json";

/// TOML flavour of [`CONFIG_FILE_NAME`].
pub const CONFIG_FILE_NAME_TOML: &str = "categories.toml";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid JSON/TOML syntax, missing required field or wrong type.
    ConfigInvalid(String),
    /// Invalid glob pattern in the exclusion rules.
    InvalidGlobPattern(String),
    /// Invalid regex pattern with the actual error reason.
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// A category name that cannot be used as a directory name.
    InvalidCategoryName(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::InvalidCategoryName(name) => {
                write!(
                    f,
                    "Invalid category name '{}': must be a plain, non-empty folder name",
                    name
                )
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Root of the configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Simulate every move instead of touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// Category declarations, in priority order (later wins on duplicates).
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,

    /// Files that must never be moved.
    #[serde(default)]
    pub exclude: ExcludeRules,
}

/// A single category declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Folder name the category's files are moved into.
    pub name: String,

    /// Disabled categories are ignored entirely.
    #[serde(default)]
    pub enabled: bool,

    /// Extensions with a leading dot, e.g. `.pdf`.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl CategoryDefinition {
    /// Convenience constructor for an enabled category.
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g. "desktop.ini").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g. "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

impl CategoryConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `categories.json`, then `categories.toml`, in the current directory
    /// 3. Look for `~/.config/dirsort/categories.json` in the home directory
    /// 4. Fall back to the built-in category set
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found (or explicitly
    /// provided) but cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self::locate_and_load(config_path)?.0)
    }

    /// Same as [`CategoryConfig::load`], also returning the file the
    /// configuration was read from (`None` for the built-in defaults).
    pub fn locate_and_load(
        config_path: Option<&Path>,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = config_path {
            return Ok((Self::load_from_file(path)?, Some(path.to_path_buf())));
        }

        for candidate in [CONFIG_FILE_NAME, CONFIG_FILE_NAME_TOML] {
            let local_config = PathBuf::from(candidate);
            if local_config.exists() {
                let config = Self::load_from_file(&local_config)?;
                return Ok((config, Some(local_config)));
            }
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join(CONFIG_FILE_NAME);
            if home_config.exists() {
                let config = Self::load_from_file(&home_config)?;
                return Ok((config, Some(home_config)));
            }
        }

        info!("No configuration file found, using built-in categories");
        Ok((Self::builtin(), None))
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` if file does not exist.
    /// Returns `ConfigError::ConfigInvalid` if parsing fails.
    /// Returns `ConfigError::IoError` if file cannot be read.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        debug!("Loaded configuration from {}", path.display());

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse configuration from JSON text.
    ///
    /// The document and every category must be JSON objects; serde would
    /// otherwise accept the positional array form of a struct.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;

        let Some(root) = value.as_object() else {
            return Err(ConfigError::ConfigInvalid(
                "expected an object at the top level".to_string(),
            ));
        };
        if let Some(categories) = root.get("categories").and_then(|c| c.as_array())
            && let Some(index) = categories.iter().position(|c| !c.is_object())
        {
            return Err(ConfigError::ConfigInvalid(format!(
                "categories[{}] must be an object",
                index
            )));
        }
        if root.get("exclude").is_some_and(|e| !e.is_object()) {
            return Err(ConfigError::ConfigInvalid(
                "exclude must be an object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Parse configuration from TOML text.
    ///
    /// Categories must be tables (`[[categories]]` or inline tables).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;

        if let Some(categories) = table.get("categories").and_then(|c| c.as_array())
            && let Some(index) = categories.iter().position(|c| !c.is_table())
        {
            return Err(ConfigError::ConfigInvalid(format!(
                "categories[{}] must be a table",
                index
            )));
        }
        if table.get("exclude").is_some_and(|e| !e.is_table()) {
            return Err(ConfigError::ConfigInvalid(
                "exclude must be a table".to_string(),
            ));
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The category set used when no configuration file exists.
    pub fn builtin() -> Self {
        Self {
            dry_run: false,
            categories: vec![
                CategoryDefinition::new(
                    "Images",
                    &[
                        ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".tiff",
                        ".ico", ".heic",
                    ],
                ),
                CategoryDefinition::new(
                    "Documents",
                    &[
                        ".pdf", ".txt", ".doc", ".docx", ".md", ".rtf", ".odt", ".epub",
                    ],
                ),
                CategoryDefinition::new(
                    "Audio",
                    &[".mp3", ".wav", ".ogg", ".flac", ".aac", ".m4a", ".wma"],
                ),
                CategoryDefinition::new(
                    "Videos",
                    &[".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv", ".webm"],
                ),
                CategoryDefinition::new(
                    "Archives",
                    &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"],
                ),
                CategoryDefinition::new(
                    "Code",
                    &[
                        ".py", ".rs", ".js", ".ts", ".c", ".cpp", ".h", ".java", ".go", ".sh",
                        ".json", ".html", ".css",
                    ],
                ),
                CategoryDefinition::new("Spreadsheets", &[".csv", ".xls", ".xlsx", ".ods"]),
                CategoryDefinition::new("Presentations", &[".ppt", ".pptx", ".odp"]),
            ],
            exclude: ExcludeRules::default(),
        }
    }

    /// Check that every enabled category name is usable as a folder name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in self.categories.iter().filter(|c| c.enabled) {
            let name = category.name.trim();
            let bad = name.is_empty()
                || name == "."
                || name == ".."
                || name.contains('/')
                || name.contains('\\');
            if bad {
                return Err(ConfigError::InvalidCategoryName(category.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_json() {
        let json = r#"{
            "dry_run": true,
            "categories": [
                { "name": "Documents", "enabled": true, "extensions": [".pdf"] },
                { "name": "Images", "enabled": false, "extensions": [".jpg", ".png"] }
            ],
            "exclude": { "filenames": ["desktop.ini"] }
        }"#;

        let config = CategoryConfig::from_json_str(json).expect("valid config");
        assert!(config.dry_run);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories[0].name, "Documents");
        assert!(!config.categories[1].enabled);
        assert_eq!(config.exclude.filenames, vec!["desktop.ini".to_string()]);
        assert!(config.exclude.patterns.is_empty());
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let config =
            CategoryConfig::from_json_str(r#"{ "categories": [ { "name": "Misc" } ] }"#)
                .expect("valid config");
        assert!(!config.dry_run);
        assert!(!config.categories[0].enabled);
        assert!(config.categories[0].extensions.is_empty());

        let empty = CategoryConfig::from_json_str("{}").expect("empty object is valid");
        assert!(empty.categories.is_empty());
    }

    #[test]
    fn test_missing_name_is_invalid() {
        let result =
            CategoryConfig::from_json_str(r#"{ "categories": [ { "enabled": true } ] }"#);
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let result = CategoryConfig::from_json_str(r#"{ "dry_run": "yes" }"#);
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));

        let result = CategoryConfig::from_json_str(r#"{ "categories": { "name": "x" } }"#);
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_positional_arrays_are_invalid() {
        for json in [
            "[]",
            r#"[true, [["Documents", true, [".pdf"]]]]"#,
            r#"{ "categories": [ ["Documents", true, [".pdf"]] ] }"#,
            r#"{ "exclude": [["desktop.ini"]] }"#,
        ] {
            assert!(
                matches!(
                    CategoryConfig::from_json_str(json),
                    Err(ConfigError::ConfigInvalid(_))
                ),
                "{} should be rejected",
                json
            );
        }

        let toml = r#"categories = [["Documents", true, [".pdf"]]]"#;
        assert!(matches!(
            CategoryConfig::from_toml_str(toml),
            Err(ConfigError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_inline_toml_tables_are_valid() {
        let toml = r#"categories = [{ name = "Documents", enabled = true, extensions = [".pdf"] }]"#;
        let config = CategoryConfig::from_toml_str(toml).expect("valid toml");
        assert_eq!(config.categories[0].name, "Documents");
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        let result = CategoryConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            dry_run = false

            [[categories]]
            name = "Documents"
            enabled = true
            extensions = [".pdf", ".txt"]

            [exclude]
            patterns = ["*.part"]
        "#;

        let config = CategoryConfig::from_toml_str(toml).expect("valid toml");
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].extensions.len(), 2);
        assert_eq!(config.exclude.patterns, vec!["*.part".to_string()]);
    }

    #[test]
    fn test_load_from_file_picks_format_by_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let json_path = temp_dir.path().join("rules.json");
        fs::write(
            &json_path,
            r#"{ "categories": [ { "name": "A", "enabled": true, "extensions": [".a"] } ] }"#,
        )
        .expect("Failed to write config");
        let config = CategoryConfig::load_from_file(&json_path).expect("json config");
        assert_eq!(config.categories[0].name, "A");

        let toml_path = temp_dir.path().join("rules.toml");
        fs::write(
            &toml_path,
            "[[categories]]\nname = \"B\"\nenabled = true\nextensions = [\".b\"]\n",
        )
        .expect("Failed to write config");
        let config = CategoryConfig::load_from_file(&toml_path).expect("toml config");
        assert_eq!(config.categories[0].name, "B");
    }

    #[test]
    fn test_explicit_missing_file_is_not_found() {
        let result = CategoryConfig::load(Some(Path::new("/non/existent/categories.json")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_builtin_is_valid() {
        let config = CategoryConfig::builtin();
        assert!(config.validate().is_ok());
        assert!(config.categories.iter().all(|c| c.enabled));
    }

    #[test]
    fn test_validate_rejects_path_like_names() {
        for name in ["", "  ", ".", "..", "a/b", "a\\b"] {
            let config = CategoryConfig {
                categories: vec![CategoryDefinition::new(name, &[".x"])],
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidCategoryName(_))),
                "name {:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_validate_ignores_disabled_categories() {
        let mut category = CategoryDefinition::new("../escape", &[".x"]);
        category.enabled = false;
        let config = CategoryConfig {
            categories: vec![category],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
