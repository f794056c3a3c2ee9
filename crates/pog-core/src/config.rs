//! Environment-driven configuration.

use std::path::PathBuf;

use crate::query::assets::{DEFAULT_ASSET_ROOT, DEFAULT_PLACEHOLDER_BASE};
use crate::query::guards::DEFAULT_LAYOUT_CACHE_SIZE;

/// Runtime settings, read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PogConfig {
    /// Dataset directory (`stores.json` plus one file per planogram).
    pub data_dir: Option<PathBuf>,
    /// SQLite catalog; preferred over `data_dir` when both are set.
    pub catalog_db: Option<PathBuf>,
    /// Prefix of image candidate names handed to the host.
    pub asset_root: String,
    /// Local directory to resolve images against, if any.
    pub asset_dir: Option<PathBuf>,
    pub placeholder_base: String,
    /// Reject datasets whose stores point at missing planograms.
    pub strict_dataset: bool,
    pub layout_cache_size: usize,
}

impl Default for PogConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            catalog_db: None,
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            asset_dir: None,
            placeholder_base: DEFAULT_PLACEHOLDER_BASE.to_string(),
            strict_dataset: true,
            layout_cache_size: DEFAULT_LAYOUT_CACHE_SIZE,
        }
    }
}

impl PogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            data_dir: get("POG_DATA_DIR").map(PathBuf::from),
            catalog_db: get("POG_CATALOG_DB").map(PathBuf::from),
            asset_root: get("POG_ASSET_ROOT").unwrap_or(defaults.asset_root),
            asset_dir: get("POG_ASSET_DIR").map(PathBuf::from),
            placeholder_base: get("POG_PLACEHOLDER_URL").unwrap_or(defaults.placeholder_base),
            strict_dataset: match get("POG_STRICT_DATASET") {
                Some(val) => flag_enabled(&val),
                None => defaults.strict_dataset,
            },
            layout_cache_size: get("POG_LAYOUT_CACHE_SIZE")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(defaults.layout_cache_size),
        }
    }
}

fn flag_enabled(val: &str) -> bool {
    let v = val.trim().to_lowercase();
    !matches!(v.as_str(), "0" | "false" | "no" | "off")
}
