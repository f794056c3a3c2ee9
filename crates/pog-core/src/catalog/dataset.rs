//! Static planogram dataset: the store map and the planogram records.
//!
//! Loaded once at startup from a JSON file, a JSON directory, or the SQLite
//! catalog, then shared read-only behind `Arc`.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use walkdir::WalkDir;

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::catalog::database::CatalogDb;
use crate::config::PogConfig;
use crate::errors::{PogError, PogResult};
use crate::models::{PlanogramMetadata, StorePreview};

/// File name of the store map inside a dataset directory.
pub const STORES_FILE: &str = "stores.json";

/// On-disk shape of a single-file dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFile {
    #[serde(default)]
    pub stores: IndexMap<String, String>,
    #[serde(default)]
    pub planograms: IndexMap<String, PlanogramMetadata>,
}

#[cfg_attr(feature = "python", pyclass(frozen))]
#[derive(Clone, Debug)]
pub struct Dataset {
    stores: IndexMap<String, String>,
    planograms: IndexMap<String, Arc<PlanogramMetadata>>,
    fingerprint: String,
}

/// SHA-256 of the canonical JSON encoding of a dataset.
pub fn dataset_fingerprint(file: &DatasetFile) -> PogResult<String> {
    let bytes = serde_json::to_vec(file)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

impl Dataset {
    /// Validate and freeze a dataset.
    ///
    /// Geometry below one side or one shelf is always rejected. A store that
    /// points at a missing planogram is rejected when `strict`, otherwise it
    /// is dropped with a warning. Products outside the fixture are only
    /// reported.
    pub fn from_file(mut file: DatasetFile, strict: bool) -> PogResult<Self> {
        for (key, pog) in file.planograms.iter_mut() {
            if pog.id.is_empty() {
                pog.id = key.clone();
            } else if pog.id != *key {
                let msg = format!("planogram keyed {key:?} declares id {:?}", pog.id);
                if strict {
                    return Err(PogError::Dataset(msg));
                }
                warn!("{msg}; using key");
                pog.id = key.clone();
            }
            if pog.sides < 1 || pog.shelves < 1 {
                return Err(PogError::Dataset(format!(
                    "planogram {key:?} has {} sides and {} shelves",
                    pog.sides, pog.shelves
                )));
            }
            let out_of_range = pog.out_of_range_products().count();
            if out_of_range > 0 {
                warn!(planogram = %key, count = out_of_range, "products outside fixture bounds");
            }
            if pog.total_products != pog.products.len() as i64 {
                warn!(
                    planogram = %key,
                    declared = pog.total_products,
                    actual = pog.products.len(),
                    "totalProducts does not match product list"
                );
            }
        }

        let mut dangling = Vec::new();
        for (store, pog_id) in &file.stores {
            if !file.planograms.contains_key(pog_id) {
                if strict {
                    return Err(PogError::UnknownPlanogram(format!(
                        "{pog_id} (store {store})"
                    )));
                }
                warn!(store = %store, planogram = %pog_id, "store maps to unknown planogram, skipping");
                dangling.push(store.clone());
            }
        }
        for store in dangling {
            file.stores.shift_remove(&store);
        }

        let fingerprint = dataset_fingerprint(&file)?;
        info!(
            stores = file.stores.len(),
            planograms = file.planograms.len(),
            "dataset loaded"
        );
        Ok(Self {
            stores: file.stores,
            planograms: file
                .planograms
                .into_iter()
                .map(|(id, pog)| (id, Arc::new(pog)))
                .collect(),
            fingerprint,
        })
    }

    pub fn from_json_str(raw: &str, strict: bool) -> PogResult<Self> {
        let file: DatasetFile = serde_json::from_str(raw)?;
        Self::from_file(file, strict)
    }

    pub fn load_json_file(path: &Path, strict: bool) -> PogResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw, strict)
    }

    /// Load a directory holding `stores.json` and one JSON file per planogram.
    ///
    /// Planogram files are read in file-name order; a file without an `id`
    /// takes its file stem as id.
    pub fn load_dir(dir: &Path, strict: bool) -> PogResult<Self> {
        let stores_path = dir.join(STORES_FILE);
        if !stores_path.is_file() {
            return Err(PogError::Dataset(format!(
                "{} not found in {}",
                STORES_FILE,
                dir.display()
            )));
        }
        let stores: IndexMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&stores_path)?)?;

        let mut planograms = IndexMap::new();
        for entry in WalkDir::new(dir).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| PogError::Dataset(e.to_string()))?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path == stores_path
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }
            let mut pog: PlanogramMetadata =
                serde_json::from_str(&std::fs::read_to_string(path)?)?;
            if pog.id.is_empty() {
                pog.id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }
            if planograms.contains_key(&pog.id) {
                return Err(PogError::Dataset(format!(
                    "duplicate planogram id {:?} in {}",
                    pog.id,
                    path.display()
                )));
            }
            planograms.insert(pog.id.clone(), pog);
        }

        Self::from_file(DatasetFile { stores, planograms }, strict)
    }

    /// Load whichever source the configuration names, catalog first.
    pub fn load(config: &PogConfig) -> PogResult<Self> {
        if let Some(db_path) = &config.catalog_db {
            return CatalogDb::open(db_path)?.load_dataset(config.strict_dataset);
        }
        if let Some(dir) = &config.data_dir {
            if dir.is_file() {
                return Self::load_json_file(dir, config.strict_dataset);
            }
            return Self::load_dir(dir, config.strict_dataset);
        }
        Err(PogError::Dataset(
            "no dataset configured (set POG_CATALOG_DB or POG_DATA_DIR)".to_string(),
        ))
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Store ids in ascending order, as offered by the store selector.
    pub fn store_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stores.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn planogram_id_for_store(&self, store: &str) -> PogResult<&str> {
        self.stores
            .get(store)
            .map(String::as_str)
            .ok_or_else(|| PogError::UnknownStore(store.to_string()))
    }

    pub fn planogram(&self, id: &str) -> PogResult<Arc<PlanogramMetadata>> {
        self.planograms
            .get(id)
            .cloned()
            .ok_or_else(|| PogError::UnknownPlanogram(id.to_string()))
    }

    pub fn planogram_for_store(&self, store: &str) -> PogResult<Arc<PlanogramMetadata>> {
        let id = self.planogram_id_for_store(store)?;
        self.planogram(id)
    }

    pub fn preview(&self, store: &str) -> PogResult<StorePreview> {
        Ok(self.planogram_for_store(store)?.preview())
    }

    pub fn planograms(&self) -> impl Iterator<Item = &Arc<PlanogramMetadata>> {
        self.planograms.values()
    }

    pub fn stores(&self) -> &IndexMap<String, String> {
        &self.stores
    }

    /// Owned copy in the single-file shape.
    pub fn to_file(&self) -> DatasetFile {
        DatasetFile {
            stores: self.stores.clone(),
            planograms: self
                .planograms
                .iter()
                .map(|(id, pog)| (id.clone(), PlanogramMetadata::clone(pog)))
                .collect(),
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl Dataset {
    #[staticmethod]
    #[pyo3(name = "from_json", signature = (raw, strict=true))]
    fn py_from_json(raw: &str, strict: bool) -> PyResult<Self> {
        Ok(Self::from_json_str(raw, strict)?)
    }

    #[staticmethod]
    #[pyo3(name = "load_dir", signature = (dir, strict=true))]
    fn py_load_dir(dir: std::path::PathBuf, strict: bool) -> PyResult<Self> {
        Ok(Self::load_dir(&dir, strict)?)
    }

    #[staticmethod]
    #[pyo3(name = "from_env")]
    fn py_from_env() -> PyResult<Self> {
        Ok(Self::load(&PogConfig::from_env())?)
    }

    #[getter(fingerprint)]
    fn py_fingerprint(&self) -> String {
        self.fingerprint.clone()
    }

    #[pyo3(name = "store_ids")]
    fn py_store_ids(&self) -> Vec<String> {
        self.store_ids()
    }

    #[pyo3(name = "planogram_for_store")]
    fn py_planogram_for_store(&self, store: &str) -> PyResult<PlanogramMetadata> {
        Ok(PlanogramMetadata::clone(&self.planogram_for_store(store)?))
    }

    #[pyo3(name = "preview")]
    fn py_preview(&self, store: &str) -> PyResult<StorePreview> {
        Ok(self.preview(store)?)
    }

    fn __repr__(&self) -> String {
        format!(
            "Dataset(stores={}, planograms={}, fingerprint={:?})",
            self.stores.len(),
            self.planograms.len(),
            &self.fingerprint[..12.min(self.fingerprint.len())],
        )
    }
}
