//! Extension-based category resolution.
//!
//! This module turns a [`CategoryConfig`] into the lookup table used during
//! organization: every enabled category contributes its extensions, and any
//! extension nobody claims falls back to [`FALLBACK_CATEGORY`].
//!
//! # Examples
//!
//! ```
//! use dirsort::category_rules::CategoryRules;
//!
//! let rules = CategoryRules::load(r#"{
//!     "categories": [
//!         { "name": "Documents", "enabled": true, "extensions": [".pdf"] }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(rules.resolve(".pdf"), "Documents");
//! assert_eq!(rules.resolve(".PDF"), "Documents");
//! assert_eq!(rules.resolve(".xyz"), "Others");
//! ```

use crate::config::{CategoryConfig, ConfigError, ExcludeRules};
use glob::Pattern;
use log::warn;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Category for files whose extension no enabled rule claims.
pub const FALLBACK_CATEGORY: &str = "Others";

/// An extension claimed by more than one enabled category.
///
/// The last declaration wins; this records who lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateExtension {
    pub extension: String,
    pub overridden: String,
    pub winner: String,
}

/// Immutable rule set for one organize run.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    extension_map: HashMap<String, String>,
    dry_run: bool,
    exclusions: Exclusions,
    duplicates: Vec<DuplicateExtension>,
}

impl CategoryRules {
    /// Parses JSON configuration text and builds the rules from it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the data does not match the expected schema,
    /// a category name is unusable, or an exclusion pattern fails to compile.
    pub fn load(config_data: &str) -> Result<Self, ConfigError> {
        Self::from_config(CategoryConfig::from_json_str(config_data)?)
    }

    /// Builds the rules from an already-parsed configuration.
    pub fn from_config(config: CategoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut extension_map: HashMap<String, String> = HashMap::new();
        let mut duplicates = Vec::new();

        for category in config.categories.iter().filter(|c| c.enabled) {
            for raw in &category.extensions {
                let Some(extension) = normalize_extension(raw) else {
                    warn!(
                        "Ignoring empty extension in category '{}'",
                        category.name
                    );
                    continue;
                };

                if let Some(previous) =
                    extension_map.insert(extension.clone(), category.name.clone())
                    && previous != category.name
                {
                    warn!(
                        "Extension '{}' is declared by '{}' and '{}'; '{}' wins",
                        extension, previous, category.name, category.name
                    );
                    duplicates.push(DuplicateExtension {
                        extension,
                        overridden: previous,
                        winner: category.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            extension_map,
            dry_run: config.dry_run,
            exclusions: Exclusions::compile(&config.exclude)?,
            duplicates,
        })
    }

    /// Returns the category for an extension (leading dot included).
    ///
    /// Lookup is case-insensitive. Unmapped extensions, including the empty
    /// extension of files without one, resolve to [`FALLBACK_CATEGORY`].
    pub fn resolve(&self, extension: &str) -> &str {
        self.extension_map
            .get(&extension.to_lowercase())
            .map(String::as_str)
            .unwrap_or(FALLBACK_CATEGORY)
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Forces dry-run on when `dry_run` is true. Never turns it off.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run |= dry_run;
        self
    }

    /// Whether a file name matches the configured exclusions.
    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.exclusions.matches(file_name)
    }

    /// Extensions claimed by several enabled categories, in declaration order.
    pub fn duplicate_extensions(&self) -> &[DuplicateExtension] {
        &self.duplicates
    }

    /// Number of distinct mapped extensions.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

/// Lowercases and ensures a leading dot. `None` for blank input.
fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        Some(lower)
    } else {
        warn!("Extension '{}' has no leading dot, using '.{}'", raw, lower);
        Some(format!(".{}", lower))
    }
}

/// Compiled exclusion rules, matched against bare file names.
#[derive(Debug, Clone, Default)]
struct Exclusions {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl Exclusions {
    fn compile(rules: &ExcludeRules) -> Result<Self, ConfigError> {
        let patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = rules
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filenames: rules.filenames.iter().cloned().collect(),
            patterns,
            regexes,
        })
    }

    fn matches(&self, file_name: &str) -> bool {
        self.filenames.contains(file_name)
            || self.patterns.iter().any(|p| p.matches(file_name))
            || self.regexes.iter().any(|r| r.is_match(file_name))
    }
}
