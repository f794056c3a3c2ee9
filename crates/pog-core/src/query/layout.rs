//! Shelf layout derivation for one side of a fixture.

use tracing::debug;

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::models::{HighlightFilter, PlanogramMetadata, Product, ShelfRow};
use crate::query::guards::navigable_sides;

/// Group the products on `active_side` into shelves, top shelf first.
///
/// Every shelf in `1..=shelves` is emitted, empty ones included. Products on
/// a shelf outside that range are dropped. Within a shelf products are
/// stable-sorted by position. The source assortment is never reordered.
pub fn build_layout_impl(planogram: &PlanogramMetadata, active_side: i64) -> Vec<ShelfRow> {
    let shelf_count = planogram.shelves.max(0) as usize;
    let mut buckets: Vec<Vec<Product>> = vec![Vec::new(); shelf_count];

    for product in planogram
        .products
        .iter()
        .filter(|p| p.segment == active_side)
    {
        if product.shelf < 1 || product.shelf > planogram.shelves {
            debug!(
                upc = %product.upc,
                shelf = product.shelf,
                planogram = %planogram.id,
                "dropping product outside shelf range"
            );
            continue;
        }
        buckets[(product.shelf - 1) as usize].push(product.clone());
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(index, mut products)| {
            products.sort_by_key(|p| p.position);
            ShelfRow {
                shelf_number: index as i64 + 1,
                products,
            }
        })
        .rev()
        .collect()
}

#[cfg(feature = "python")]
#[pyfunction]
pub fn build_layout(planogram: &PlanogramMetadata, active_side: i64) -> Vec<ShelfRow> {
    build_layout_impl(planogram, active_side)
}

/// Whether a product is de-emphasized under the given highlight filter.
#[cfg_attr(feature = "python", pyfunction)]
pub fn is_dimmed(product: &Product, filter: HighlightFilter) -> bool {
    match filter {
        HighlightFilter::None => false,
        HighlightFilter::NewItemsOnly => !product.is_new,
        HighlightFilter::SrpOnly => product.srp.is_none(),
    }
}

/// Side buttons to offer; a single-sided fixture gets no side navigation.
#[cfg_attr(feature = "python", pyfunction)]
pub fn side_tabs(sides: i64) -> Vec<i64> {
    if sides <= 1 {
        return Vec::new();
    }
    (1..=navigable_sides(sides)).collect()
}
