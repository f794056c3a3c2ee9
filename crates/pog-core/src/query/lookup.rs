//! Product lookup: code normalization, redirect resolution, and matching.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::errors::{PogError, PogResult};
use crate::models::{LookupMatch, PlanogramMetadata, Product};

static NON_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9]").unwrap());

/// Strip every non-digit from a scanned or typed code. Leading zeros stay.
#[cfg_attr(feature = "python", pyfunction)]
pub fn normalize_upc(raw_code: &str) -> String {
    NON_DIGIT_RE.replace_all(raw_code, "").into_owned()
}

/// Exact or suffix match in either direction, so a 12-digit UPC-A finds a
/// 13-digit EAN-13 and vice versa. Empty codes never match.
#[cfg_attr(feature = "python", pyfunction)]
pub fn upc_matches(stored_upc: &str, target_code: &str) -> bool {
    if stored_upc.is_empty() || target_code.is_empty() {
        return false;
    }
    stored_upc == target_code
        || stored_upc.ends_with(target_code)
        || target_code.ends_with(stored_upc)
}

/// First product in assortment order matching `target_code`.
pub fn find_product<'a>(products: &'a [Product], target_code: &str) -> Option<&'a Product> {
    products.iter().find(|p| upc_matches(&p.upc, target_code))
}

/// Resolve a raw code against one planogram.
///
/// Redirects are single hop: the mapped code is matched directly and is not
/// looked up in the redirect table again.
pub fn resolve_product_impl(raw_code: &str, planogram: &PlanogramMetadata) -> PogResult<LookupMatch> {
    let clean_code = normalize_upc(raw_code);

    let (target_code, redirected_from) = match planogram.upc_redirects.get(&clean_code) {
        Some(new_upc) => {
            debug!(old = %clean_code, new = %new_upc, "upc redirected");
            (new_upc.clone(), Some(clean_code.clone()))
        }
        None => (clean_code.clone(), None),
    };

    match find_product(&planogram.products, &target_code) {
        Some(product) => Ok(LookupMatch {
            product: product.clone(),
            redirected_from,
            target_code,
        }),
        None => {
            debug!(code = %clean_code, planogram = %planogram.id, "product not found");
            Err(PogError::NotFound { code: clean_code })
        }
    }
}

#[cfg(feature = "python")]
#[pyfunction]
pub fn resolve_product(raw_code: &str, planogram: &PlanogramMetadata) -> PyResult<LookupMatch> {
    Ok(resolve_product_impl(raw_code, planogram)?)
}
