//! dirsort - sort a directory's files into category folders
//!
//! This library resolves a category for every file from its extension,
//! picks a collision-free destination inside the matching category folder
//! and moves the file there, tallying what moved and what failed. Category
//! rules are loaded from a JSON or TOML configuration file.

pub mod background;
pub mod category_rules;
pub mod cli;
pub mod config;
pub mod file_mover;
pub mod organizer;
pub mod output;
pub mod path_allocator;

pub use background::{OrganizeHandle, spawn_organize};
pub use category_rules::{CategoryRules, FALLBACK_CATEGORY};
pub use config::{CategoryConfig, ConfigError};
pub use file_mover::{FileMover, FsMover};
pub use organizer::{OrganizeEngine, OrganizeError, OrganizeResult};
pub use path_allocator::PathAllocator;

pub use cli::{Cli, run_cli};
