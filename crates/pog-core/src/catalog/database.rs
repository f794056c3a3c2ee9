//! SQLite catalog holding one static planogram dataset.
//!
//! Each public method opens its own connection so callers never manage
//! connection lifetime.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rusqlite::{params, Connection, Transaction};
use tracing::info;

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::catalog::dataset::{Dataset, DatasetFile};
use crate::catalog::schema;
use crate::errors::PogResult;
use crate::models::{PlanogramMetadata, Product};

const FINGERPRINT_KEY: &str = "dataset_fingerprint";

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    if raw == "~" || raw.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if raw.len() > 2 {
                expanded.push(&raw[2..]);
            }
            return expanded;
        }
    }
    path.to_path_buf()
}

#[cfg_attr(feature = "python", pyclass(frozen))]
#[derive(Clone, Debug)]
pub struct CatalogDb {
    db_path: PathBuf,
}

impl CatalogDb {
    /// Resolve the path, create parent directories, and bring the schema up
    /// to date.
    pub fn open(db_path: &Path) -> PogResult<Self> {
        let expanded = expand_tilde(db_path);
        let resolved = if expanded.is_absolute() {
            expanded
        } else {
            std::env::current_dir()?.join(&expanded)
        };
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Self { db_path: resolved };
        db.init_schema()?;
        Ok(db)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> PogResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    pub fn init_schema(&self) -> PogResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        schema::migrate_schema(&conn)?;
        Ok(())
    }

    pub fn stored_fingerprint(&self) -> PogResult<Option<String>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT value FROM catalog_meta WHERE key = ?1;",
            params![FINGERPRINT_KEY],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the catalog content with `dataset` in one transaction.
    ///
    /// Returns `false` without touching the catalog when it already holds a
    /// dataset with the same fingerprint.
    pub fn import_dataset(&self, dataset: &Dataset) -> PogResult<bool> {
        if self.stored_fingerprint()?.as_deref() == Some(dataset.fingerprint()) {
            info!(fingerprint = %dataset.fingerprint(), "catalog already up to date");
            return Ok(false);
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM upc_redirects; DELETE FROM products; \
             DELETE FROM stores; DELETE FROM planograms;",
        )?;

        for (ordinal, pog) in dataset.planograms().enumerate() {
            insert_planogram(&tx, ordinal as i64, pog)?;
        }
        for (ordinal, (store, pog_id)) in dataset.stores().iter().enumerate() {
            tx.execute(
                "INSERT INTO stores(store_id, ordinal, planogram_id) VALUES (?1, ?2, ?3);",
                params![store, ordinal as i64, pog_id],
            )?;
        }
        tx.execute(
            "INSERT INTO catalog_meta(key, value) VALUES(?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![FINGERPRINT_KEY, dataset.fingerprint()],
        )?;
        tx.commit()?;

        info!(
            path = %self.db_path.display(),
            stores = dataset.stores().len(),
            "catalog imported"
        );
        Ok(true)
    }

    /// Read the catalog back, preserving product and redirect order.
    pub fn load_dataset(&self, strict: bool) -> PogResult<Dataset> {
        let conn = self.connect()?;
        let mut planograms = IndexMap::new();

        let mut stmt = conn.prepare(
            "SELECT id, name, subtitle, pog_number, live_date, sides, shelves, \
             total_products, pdf_url FROM planograms ORDER BY ordinal ASC;",
        )?;
        let headers = stmt
            .query_map([], |row| {
                Ok(PlanogramMetadata {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    subtitle: row.get(2)?,
                    pog_number: row.get(3)?,
                    live_date: row.get(4)?,
                    sides: row.get(5)?,
                    shelves: row.get(6)?,
                    total_products: row.get(7)?,
                    upc_redirects: IndexMap::new(),
                    products: Vec::new(),
                    pdf_url: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for mut pog in headers {
            pog.products = load_products(&conn, &pog.id)?;
            pog.upc_redirects = load_redirects(&conn, &pog.id)?;
            planograms.insert(pog.id.clone(), pog);
        }

        let mut stmt =
            conn.prepare("SELECT store_id, planogram_id FROM stores ORDER BY ordinal ASC;")?;
        let stores = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<IndexMap<_, _>, _>>()?;

        Dataset::from_file(DatasetFile { stores, planograms }, strict)
    }
}

fn insert_planogram(tx: &Transaction<'_>, ordinal: i64, pog: &PlanogramMetadata) -> PogResult<()> {
    tx.execute(
        "INSERT INTO planograms(id, ordinal, name, subtitle, pog_number, live_date, \
         sides, shelves, total_products, pdf_url) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            pog.id,
            ordinal,
            pog.name,
            pog.subtitle,
            pog.pog_number,
            pog.live_date,
            pog.sides,
            pog.shelves,
            pog.total_products,
            pog.pdf_url,
        ],
    )?;

    let mut insert_product = tx.prepare(
        "INSERT INTO products(planogram_id, ordinal, upc, name, segment, shelf, position, \
         facings, is_new, is_move, is_change, srp, image_url) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
    )?;
    for (i, p) in pog.products.iter().enumerate() {
        insert_product.execute(params![
            pog.id,
            i as i64,
            p.upc,
            p.name,
            p.segment,
            p.shelf,
            p.position,
            p.facings,
            p.is_new,
            p.is_move,
            p.is_change,
            p.srp,
            p.image_url,
        ])?;
    }

    let mut insert_redirect = tx.prepare(
        "INSERT INTO upc_redirects(planogram_id, ordinal, old_upc, new_upc) \
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (i, (old_upc, new_upc)) in pog.upc_redirects.iter().enumerate() {
        insert_redirect.execute(params![pog.id, i as i64, old_upc, new_upc])?;
    }
    Ok(())
}

fn load_products(conn: &Connection, planogram_id: &str) -> PogResult<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT upc, name, segment, shelf, position, facings, is_new, is_move, is_change, \
         srp, image_url FROM products WHERE planogram_id = ?1 ORDER BY ordinal ASC;",
    )?;
    let products = stmt
        .query_map(params![planogram_id], |row| {
            Ok(Product {
                upc: row.get(0)?,
                name: row.get(1)?,
                segment: row.get(2)?,
                shelf: row.get(3)?,
                position: row.get(4)?,
                facings: row.get(5)?,
                is_new: row.get(6)?,
                is_move: row.get(7)?,
                is_change: row.get(8)?,
                srp: row.get(9)?,
                image_url: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(products)
}

fn load_redirects(conn: &Connection, planogram_id: &str) -> PogResult<IndexMap<String, String>> {
    let mut stmt = conn.prepare(
        "SELECT old_upc, new_upc FROM upc_redirects WHERE planogram_id = ?1 \
         ORDER BY ordinal ASC;",
    )?;
    let redirects = stmt
        .query_map(params![planogram_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<IndexMap<_, _>, _>>()?;
    Ok(redirects)
}

#[cfg(feature = "python")]
#[pymethods]
impl CatalogDb {
    #[new]
    fn py_new(db_path: PathBuf) -> PyResult<Self> {
        Ok(Self::open(&db_path)?)
    }

    #[getter(db_path)]
    fn py_db_path(&self) -> String {
        self.db_path.to_string_lossy().into_owned()
    }

    #[pyo3(name = "import_dataset")]
    fn py_import_dataset(&self, dataset: &Dataset) -> PyResult<bool> {
        Ok(self.import_dataset(dataset)?)
    }

    #[pyo3(name = "load_dataset", signature = (strict=true))]
    fn py_load_dataset(&self, strict: bool) -> PyResult<Dataset> {
        Ok(self.load_dataset(strict)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dataset::fixtures::sample;

    #[test]
    fn import_then_load_round_trips_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let db = CatalogDb::open(&dir.path().join("nested/catalog.db")).unwrap();
        let ds = sample();

        assert!(db.import_dataset(&ds).unwrap());
        let loaded = db.load_dataset(true).unwrap();

        assert_eq!(loaded.fingerprint(), ds.fingerprint());
        assert_eq!(loaded.to_file(), ds.to_file());
        assert_eq!(
            db.stored_fingerprint().unwrap().as_deref(),
            Some(ds.fingerprint())
        );
    }

    #[test]
    fn reimporting_the_same_dataset_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let db = CatalogDb::open(&dir.path().join("catalog.db")).unwrap();
        let ds = sample();
        assert!(db.import_dataset(&ds).unwrap());
        assert!(!db.import_dataset(&ds).unwrap());
    }

    #[test]
    fn import_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let db = CatalogDb::open(&dir.path().join("catalog.db")).unwrap();
        db.import_dataset(&sample()).unwrap();

        let small = Dataset::from_json_str(
            r#"{"stores": {"1": "solo"}, "planograms": {"solo": {"name": "Solo", "sides": 1, "shelves": 1}}}"#,
            true,
        )
        .unwrap();
        assert!(db.import_dataset(&small).unwrap());
        let loaded = db.load_dataset(true).unwrap();
        assert_eq!(loaded.store_ids(), vec!["1"]);
        assert_eq!(loaded.planograms().count(), 1);
    }

    #[test]
    fn reopening_keeps_schema_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        let ds = sample();
        CatalogDb::open(&path).unwrap().import_dataset(&ds).unwrap();

        let reopened = CatalogDb::open(&path).unwrap();
        assert_eq!(
            reopened.stored_fingerprint().unwrap().as_deref(),
            Some(ds.fingerprint())
        );
        let conn = reopened.connect().unwrap();
        assert_eq!(schema::schema_version(&conn).unwrap(), schema::SCHEMA_VERSION);
    }

    #[test]
    fn empty_catalog_has_no_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let db = CatalogDb::open(&dir.path().join("catalog.db")).unwrap();
        assert_eq!(db.stored_fingerprint().unwrap(), None);
        assert_eq!(db.load_dataset(true).unwrap().store_ids(), Vec::<String>::new());
    }

    #[test]
    fn dataset_load_prefers_catalog_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        CatalogDb::open(&db_path)
            .unwrap()
            .import_dataset(&sample())
            .unwrap();

        let config = crate::config::PogConfig {
            catalog_db: Some(db_path),
            data_dir: Some(dir.path().join("does-not-exist")),
            ..Default::default()
        };
        let ds = Dataset::load(&config).unwrap();
        assert_eq!(ds.store_ids(), vec!["0412", "1187", "2203"]);
    }
}
