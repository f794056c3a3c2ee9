//! Product image candidate chain.
//!
//! The host tries to load each candidate in order and reports failures; the
//! chain ends on a generated placeholder labeled with the stripped code.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::config::PogConfig;
use crate::errors::{PogError, PogResult};
use crate::query::lookup::normalize_upc;

pub const DEFAULT_ASSET_ROOT: &str = "/";
pub const DEFAULT_PLACEHOLDER_BASE: &str = "https://placehold.co/100x300/222/FFF";

/// `(use stripped code, extension)` in try order.
const CANDIDATE_PATTERN: &[(bool, &str)] = &[
    (true, "webp"),
    (false, "webp"),
    (true, "png"),
    (true, "jpg"),
    (true, "jpeg"),
    (false, "png"),
    (false, "jpg"),
];

/// Digits of `upc` without leading zeros; `"0"` when nothing remains.
#[cfg_attr(feature = "python", pyfunction)]
pub fn strip_leading_zeros(upc: &str) -> String {
    let digits = normalize_upc(upc);
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Asset names to try for `upc`, in order.
#[cfg_attr(feature = "python", pyfunction)]
#[cfg_attr(feature = "python", pyo3(signature = (upc, asset_root=DEFAULT_ASSET_ROOT)))]
pub fn image_candidates(upc: &str, asset_root: &str) -> Vec<String> {
    let stripped = strip_leading_zeros(upc);
    let root = asset_root.trim_end_matches('/');
    CANDIDATE_PATTERN
        .iter()
        .map(|(use_stripped, ext)| {
            let stem = if *use_stripped { stripped.as_str() } else { upc };
            format!("{root}/{stem}.{ext}")
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum ImageSource {
    Candidate(String),
    Placeholder(String),
}

impl ImageSource {
    pub fn as_str(&self) -> &str {
        match self {
            ImageSource::Candidate(s) | ImageSource::Placeholder(s) => s,
        }
    }
}

/// Explicit state machine over the candidate list: an index into the
/// candidates, or exhausted once it reaches the end.
#[derive(Clone, Debug)]
pub struct ImageChain {
    upc: String,
    asset_root: String,
    placeholder_base: String,
    candidates: Vec<String>,
    index: usize,
}

impl ImageChain {
    pub fn new(upc: &str, asset_root: &str, placeholder_base: &str) -> Self {
        Self {
            upc: upc.to_string(),
            asset_root: asset_root.to_string(),
            placeholder_base: placeholder_base.to_string(),
            candidates: image_candidates(upc, asset_root),
            index: 0,
        }
    }

    pub fn with_defaults(upc: &str) -> Self {
        Self::new(upc, DEFAULT_ASSET_ROOT, DEFAULT_PLACEHOLDER_BASE)
    }

    pub fn upc(&self) -> &str {
        &self.upc
    }

    pub fn attempt(&self) -> usize {
        self.index
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.candidates.len()
    }

    pub fn current(&self) -> ImageSource {
        match self.candidates.get(self.index) {
            Some(candidate) => ImageSource::Candidate(candidate.clone()),
            None => ImageSource::Placeholder(format!(
                "{}?text={}",
                self.placeholder_base,
                strip_leading_zeros(&self.upc)
            )),
        }
    }

    /// Record that the current candidate failed to load and move on.
    /// Failures on the placeholder are absorbed.
    pub fn fail(&mut self) -> ImageSource {
        if !self.is_exhausted() {
            trace!(upc = %self.upc, attempt = self.index, "image candidate failed");
            self.index += 1;
        }
        self.current()
    }

    /// Point the chain at a new UPC; a no-op when the UPC is unchanged.
    pub fn reset(&mut self, upc: &str) {
        if upc == self.upc {
            return;
        }
        self.upc = upc.to_string();
        self.candidates = image_candidates(upc, &self.asset_root);
        self.index = 0;
    }
}

/// Resolves the candidate chain against a local asset directory.
#[derive(Clone, Debug)]
pub struct AssetResolver {
    asset_dir: PathBuf,
    placeholder_base: String,
}

impl AssetResolver {
    pub fn new(asset_dir: impl Into<PathBuf>, placeholder_base: &str) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            placeholder_base: placeholder_base.to_string(),
        }
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Walk the chain until a candidate exists on disk, else the placeholder.
    pub fn resolve(&self, upc: &str) -> ImageSource {
        let mut chain = ImageChain::new(upc, "", &self.placeholder_base);
        while let ImageSource::Candidate(name) = chain.current() {
            match self.probe(&name) {
                Ok(path) => {
                    debug!(upc, path = %path.display(), "image resolved");
                    return ImageSource::Candidate(path.to_string_lossy().into_owned());
                }
                Err(err) => {
                    trace!(upc, %err, "asset candidate skipped");
                    chain.fail();
                }
            }
        }
        chain.current()
    }

    fn probe(&self, name: &str) -> PogResult<PathBuf> {
        let path = self.asset_dir.join(name.trim_start_matches('/'));
        if path.is_file() {
            Ok(path)
        } else {
            Err(PogError::AssetLoad(path.to_string_lossy().into_owned()))
        }
    }
}

/// Image settings carried by a session.
#[derive(Clone, Debug)]
pub struct ImageSettings {
    pub asset_root: String,
    pub placeholder_base: String,
    pub resolver: Option<AssetResolver>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            placeholder_base: DEFAULT_PLACEHOLDER_BASE.to_string(),
            resolver: None,
        }
    }
}

impl ImageSettings {
    pub fn from_config(config: &PogConfig) -> Self {
        Self {
            asset_root: config.asset_root.clone(),
            placeholder_base: config.placeholder_base.clone(),
            resolver: config
                .asset_dir
                .as_ref()
                .map(|dir| AssetResolver::new(dir.clone(), &config.placeholder_base)),
        }
    }

    pub fn chain(&self, upc: &str) -> ImageChain {
        ImageChain::new(upc, &self.asset_root, &self.placeholder_base)
    }

    /// Best source without a host round trip: the first file on disk when an
    /// asset directory is configured, otherwise the first candidate name.
    pub fn source(&self, upc: &str) -> ImageSource {
        match &self.resolver {
            Some(resolver) => resolver.resolve(upc),
            None => self.chain(upc).current(),
        }
    }
}
