//! pog-core: planogram catalog browser core.
//!
//! Product lookup with UPC redirects and suffix matching, shelf layout
//! derivation, the browsing session state machine, and the static dataset
//! and SQLite catalog it runs on. With the `python` feature the crate also
//! builds the `_pog_core` extension module.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod query;
pub mod session;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

// ---------------------------------------------------------------------------
// Top-level Python module: _pog_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _pog_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // -- Models -------------------------------------------------------------
    models::register_models(m)?;

    // -- Catalog ------------------------------------------------------------
    m.add_class::<catalog::dataset::Dataset>()?;
    m.add_class::<catalog::database::CatalogDb>()?;
    m.add("SCHEMA_VERSION", catalog::schema::SCHEMA_VERSION)?;

    // -- Session ------------------------------------------------------------
    m.add_class::<session::state::PySession>()?;

    // -- Query: guards ------------------------------------------------------
    m.add("MAX_CODE_INPUT_LENGTH", query::guards::MAX_CODE_INPUT_LENGTH)?;
    m.add(
        "DEFAULT_LAYOUT_CACHE_SIZE",
        query::guards::DEFAULT_LAYOUT_CACHE_SIZE,
    )?;
    m.add_function(wrap_pyfunction!(query::guards::clamp_int, m)?)?;
    m.add_function(wrap_pyfunction!(query::guards::navigable_sides, m)?)?;
    m.add_function(wrap_pyfunction!(query::guards::side_in_range, m)?)?;
    m.add_function(wrap_pyfunction!(query::guards::truncate_code_input, m)?)?;

    // -- Query: lookup ------------------------------------------------------
    m.add_function(wrap_pyfunction!(query::lookup::normalize_upc, m)?)?;
    m.add_function(wrap_pyfunction!(query::lookup::upc_matches, m)?)?;
    m.add_function(wrap_pyfunction!(query::lookup::resolve_product, m)?)?;

    // -- Query: layout ------------------------------------------------------
    m.add_function(wrap_pyfunction!(query::layout::build_layout, m)?)?;
    m.add_function(wrap_pyfunction!(query::layout::is_dimmed, m)?)?;
    m.add_function(wrap_pyfunction!(query::layout::side_tabs, m)?)?;

    // -- Query: assets ------------------------------------------------------
    m.add("DEFAULT_ASSET_ROOT", query::assets::DEFAULT_ASSET_ROOT)?;
    m.add(
        "DEFAULT_PLACEHOLDER_BASE",
        query::assets::DEFAULT_PLACEHOLDER_BASE,
    )?;
    m.add_function(wrap_pyfunction!(query::assets::strip_leading_zeros, m)?)?;
    m.add_function(wrap_pyfunction!(query::assets::image_candidates, m)?)?;

    Ok(())
}
