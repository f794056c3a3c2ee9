//! Shared typed models used across the dataset, query, and session layers.
//!
//! Field names serialize in camelCase so dataset files written for the web
//! client load unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[cfg(feature = "python")]
use pyo3::prelude::*;

// ---------------------------------------------------------------------------
// 1. Product
// ---------------------------------------------------------------------------

/// A single placement of a product on a fixture.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub upc: String,
    pub name: String,
    /// Physical side of the fixture, 1-based.
    pub segment: i64,
    /// Shelf index, 1-based from the bottom.
    pub shelf: i64,
    /// Left-to-right order within the shelf.
    pub position: i64,
    /// Display-width weight.
    pub facings: i64,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_move: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_change: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Merchandising badges in display order.
    pub fn badges(&self) -> Vec<Badge> {
        let mut badges = Vec::new();
        if self.is_new {
            badges.push(Badge::New);
        }
        if self.srp.is_some() {
            badges.push(Badge::Srp);
        }
        if self.is_change {
            badges.push(Badge::Change);
        }
        if self.is_move {
            badges.push(Badge::Move);
        }
        badges
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl Product {
    #[pyo3(name = "badges")]
    fn py_badges(&self) -> Vec<Badge> {
        self.badges()
    }

    fn __repr__(&self) -> String {
        format!(
            "Product(upc={:?}, name={:?}, segment={}, shelf={}, position={}, facings={})",
            self.upc, self.name, self.segment, self.shelf, self.position, self.facings,
        )
    }
}

// ---------------------------------------------------------------------------
// 2. Badge
// ---------------------------------------------------------------------------

#[cfg_attr(feature = "python", pyclass(eq, eq_int, frozen))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    New,
    Srp,
    Change,
    Move,
}

impl Badge {
    pub fn label(self) -> &'static str {
        match self {
            Badge::New => "NEW ITEM",
            Badge::Srp => "SRP PACKAGING",
            Badge::Change => "CHANGE",
            Badge::Move => "MOVE",
        }
    }
}

// ---------------------------------------------------------------------------
// 3. PlanogramMetadata
// ---------------------------------------------------------------------------

/// One planogram: fixture geometry, the product assortment, and the UPC
/// redirect table.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanogramMetadata {
    /// Filled from the dataset key or file stem when absent.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub pog_number: String,
    #[serde(default)]
    pub live_date: String,
    pub sides: i64,
    pub shelves: i64,
    #[serde(default)]
    pub total_products: i64,
    /// Old UPC -> replacement UPC. Consulted once per lookup, never chained.
    #[serde(default)]
    pub upc_redirects: IndexMap<String, String>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pdf_url: String,
}

impl PlanogramMetadata {
    /// Products whose shelf or side falls outside the declared fixture.
    pub fn out_of_range_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(move |p| {
            p.shelf < 1 || p.shelf > self.shelves || p.segment < 1 || p.segment > self.sides
        })
    }

    /// Short summary shown before a store is confirmed.
    pub fn preview(&self) -> StorePreview {
        StorePreview {
            planogram_id: self.id.clone(),
            name: self.name.clone(),
            subtitle: self.subtitle.clone(),
            pog_number: self.pog_number.clone(),
            total_products: self.total_products,
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl PlanogramMetadata {
    fn __repr__(&self) -> String {
        format!(
            "PlanogramMetadata(id={:?}, name={:?}, sides={}, shelves={}, products={})",
            self.id,
            self.name,
            self.sides,
            self.shelves,
            self.products.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// 4. StorePreview
// ---------------------------------------------------------------------------

#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePreview {
    pub planogram_id: String,
    pub name: String,
    pub subtitle: String,
    pub pog_number: String,
    pub total_products: i64,
}

// ---------------------------------------------------------------------------
// 5. ShelfRow
// ---------------------------------------------------------------------------

/// One shelf of the derived layout, products ordered left to right.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfRow {
    pub shelf_number: i64,
    pub products: Vec<Product>,
}

impl ShelfRow {
    /// Sum of facings on the shelf; each product's share of the strip width
    /// is `facings / total_facings`.
    pub fn total_facings(&self) -> i64 {
        self.products.iter().map(|p| p.facings.max(1)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl ShelfRow {
    #[pyo3(name = "total_facings")]
    fn py_total_facings(&self) -> i64 {
        self.total_facings()
    }

    fn __repr__(&self) -> String {
        format!(
            "ShelfRow(shelf_number={}, products={})",
            self.shelf_number,
            self.products.len()
        )
    }
}

// ---------------------------------------------------------------------------
// 6. Lookup results
// ---------------------------------------------------------------------------

/// Notice shown with a product that was reached through a UPC redirect.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectNotice {
    pub old_upc: String,
    pub new_upc: String,
}

/// A successful product lookup.
#[cfg_attr(feature = "python", pyclass(frozen, get_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupMatch {
    pub product: Product,
    /// Normalized code the user entered when it was redirected.
    pub redirected_from: Option<String>,
    /// Code actually matched against the assortment.
    pub target_code: String,
}

impl LookupMatch {
    pub fn redirect_notice(&self) -> Option<RedirectNotice> {
        self.redirected_from.as_ref().map(|old| RedirectNotice {
            old_upc: old.clone(),
            new_upc: self.target_code.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// 7. View state enums
// ---------------------------------------------------------------------------

#[cfg_attr(feature = "python", pyclass(eq, eq_int, frozen))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    BrowseShelf,
    ScanBarcode,
    ManualEntry,
}

/// Visual emphasis applied while browsing; not a view mode.
#[cfg_attr(feature = "python", pyclass(eq, eq_int, frozen))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightFilter {
    #[default]
    #[cfg_attr(feature = "python", pyo3(name = "NONE"))]
    None,
    NewItemsOnly,
    SrpOnly,
}

// ---------------------------------------------------------------------------
// Module registration helper
// ---------------------------------------------------------------------------

/// Register all model types on a Python module.
#[cfg(feature = "python")]
pub fn register_models(m: &Bound<'_, pyo3::types::PyModule>) -> PyResult<()> {
    m.add_class::<Product>()?;
    m.add_class::<Badge>()?;
    m.add_class::<PlanogramMetadata>()?;
    m.add_class::<StorePreview>()?;
    m.add_class::<ShelfRow>()?;
    m.add_class::<RedirectNotice>()?;
    m.add_class::<LookupMatch>()?;
    m.add_class::<ViewMode>()?;
    m.add_class::<HighlightFilter>()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn product(upc: &str, segment: i64, shelf: i64, position: i64) -> Product {
        Product {
            upc: upc.to_string(),
            name: format!("Product {upc}"),
            segment,
            shelf,
            position,
            facings: 1,
            is_new: false,
            is_move: false,
            is_change: false,
            srp: None,
            image_url: None,
        }
    }

    pub fn planogram(sides: i64, shelves: i64, products: Vec<Product>) -> PlanogramMetadata {
        PlanogramMetadata {
            id: "endcap".to_string(),
            name: "Suncare Endcap".to_string(),
            subtitle: "4ft endcap".to_string(),
            pog_number: "POG-0001".to_string(),
            live_date: "2026-03-01".to_string(),
            sides,
            shelves,
            total_products: products.len() as i64,
            upc_redirects: IndexMap::new(),
            products,
            pdf_url: "endcap.pdf".to_string(),
        }
    }
}
