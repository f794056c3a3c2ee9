//! Browsing session: store selection, view mode, side, filter, the displayed
//! product, the document viewer, and the scan session.
//!
//! All UI-visible transitions go through [`Session::apply`], which mutates the
//! session and returns the effects collaborators must act on.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::catalog::dataset::Dataset;
use crate::config::PogConfig;
use crate::errors::{PogError, PogResult};
use crate::models::{HighlightFilter, PlanogramMetadata, Product, RedirectNotice, ShelfRow, ViewMode};
use crate::query::assets::{ImageChain, ImageSettings, ImageSource};
use crate::query::guards::{side_in_range, truncate_code_input};
use crate::query::layout::{is_dimmed, side_tabs};
use crate::query::lookup::resolve_product_impl;
use crate::query::planner::LayoutCache;
use crate::session::documents::{DocumentKind, DocumentViewer};
use crate::session::scanner::{DecodeBackend, ScanController};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SessionAction {
    SelectStore(String),
    /// Back to the store selector.
    ChangeStore,
    SelectTab(ViewMode),
    SelectSide(i64),
    SetFilter(HighlightFilter),
    EditManualInput(String),
    SubmitManualInput,
    /// Retry after a failed scanner start.
    StartScan,
    StopScan,
    ScanDecoded(String),
    ScanFrameError(String),
    TapProduct(Product),
    CloseProduct,
    OpenDocuments,
    CloseDocuments,
    SelectDocument(DocumentKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    ShowStoreSelector,
    RederiveLayout {
        planogram_id: String,
        side: i64,
    },
    ShowProduct {
        product: Product,
        redirect: Option<RedirectNotice>,
    },
    HideProduct,
    NotFound {
        code: String,
        message: String,
    },
    DecodeSessionError {
        message: String,
    },
    ScanStarted,
    ScanStopped,
    OpenDocument {
        url: String,
    },
    CloseDocument,
}

pub struct Session {
    dataset: Arc<Dataset>,
    layouts: Arc<LayoutCache>,
    images: ImageSettings,
    store: Option<String>,
    planogram: Option<Arc<PlanogramMetadata>>,
    mode: ViewMode,
    side: i64,
    filter: HighlightFilter,
    product: Option<Product>,
    redirect: Option<RedirectNotice>,
    manual_input: String,
    viewer: Option<DocumentViewer>,
    scanner: ScanController,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store", &self.store)
            .field("mode", &self.mode)
            .field("side", &self.side)
            .field("filter", &self.filter)
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(dataset: Arc<Dataset>, backend: Box<dyn DecodeBackend>) -> Self {
        Self::with_layout_cache(dataset, Arc::new(LayoutCache::default()), backend)
    }

    /// Load the configured dataset and build a session around it.
    pub fn from_config(config: &PogConfig, backend: Box<dyn DecodeBackend>) -> PogResult<Self> {
        let dataset = Arc::new(Dataset::load(config)?);
        let layouts = Arc::new(LayoutCache::new(config.layout_cache_size));
        let mut session = Self::with_layout_cache(dataset, layouts, backend);
        session.images = ImageSettings::from_config(config);
        Ok(session)
    }

    /// Session sharing a layout cache with other sessions over the same
    /// dataset.
    pub fn with_layout_cache(
        dataset: Arc<Dataset>,
        layouts: Arc<LayoutCache>,
        backend: Box<dyn DecodeBackend>,
    ) -> Self {
        Self {
            dataset,
            layouts,
            images: ImageSettings::default(),
            store: None,
            planogram: None,
            mode: ViewMode::default(),
            side: 1,
            filter: HighlightFilter::default(),
            product: None,
            redirect: None,
            manual_input: String::new(),
            viewer: None,
            scanner: ScanController::new(backend),
        }
    }

    // ── accessors ──────────────────────────────────────────────────────

    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    pub fn planogram(&self) -> Option<&Arc<PlanogramMetadata>> {
        self.planogram.as_ref()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn side(&self) -> i64 {
        self.side
    }

    pub fn filter(&self) -> HighlightFilter {
        self.filter
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    pub fn redirect(&self) -> Option<&RedirectNotice> {
        self.redirect.as_ref()
    }

    pub fn manual_input(&self) -> &str {
        &self.manual_input
    }

    pub fn viewer(&self) -> Option<&DocumentViewer> {
        self.viewer.as_ref()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner.is_active()
    }

    /// Shelves of the active side, top shelf first.
    pub fn layout(&self) -> Option<Arc<[ShelfRow]>> {
        let pog = self.planogram.as_ref()?;
        Some(self.layouts.get_or_build(self.dataset.fingerprint(), pog, self.side))
    }

    pub fn side_tabs(&self) -> Vec<i64> {
        self.planogram
            .as_ref()
            .map(|pog| side_tabs(pog.sides))
            .unwrap_or_default()
    }

    pub fn is_dimmed(&self, product: &Product) -> bool {
        is_dimmed(product, self.filter)
    }

    pub fn image_chain(&self, product: &Product) -> ImageChain {
        self.images.chain(&product.upc)
    }

    /// An explicit image URL on the product wins over the candidate chain.
    pub fn image_source(&self, product: &Product) -> ImageSource {
        match &product.image_url {
            Some(url) => ImageSource::Candidate(url.clone()),
            None => self.images.source(&product.upc),
        }
    }

    // ── transitions ────────────────────────────────────────────────────

    /// Apply one action. Only selecting an unknown store fails; every other
    /// failure surfaces as a notice effect.
    pub fn apply(&mut self, action: SessionAction) -> PogResult<Vec<Effect>> {
        let action = match action {
            SessionAction::SelectStore(store) => return self.select_store(&store),
            SessionAction::ChangeStore => return Ok(self.change_store()),
            other => other,
        };

        let Some(pog) = self.planogram.clone() else {
            debug!(?action, "no store selected, ignoring");
            return Ok(Vec::new());
        };

        let effects = match action {
            SessionAction::SelectStore(_) | SessionAction::ChangeStore => Vec::new(),
            SessionAction::SelectTab(mode) => self.select_tab(mode),
            SessionAction::SelectSide(side) => self.select_side(&pog, side),
            SessionAction::SetFilter(filter) => {
                self.filter = filter;
                Vec::new()
            }
            SessionAction::EditManualInput(input) => {
                self.manual_input = truncate_code_input(&input);
                Vec::new()
            }
            SessionAction::SubmitManualInput => {
                if self.mode != ViewMode::ManualEntry {
                    debug!(mode = ?self.mode, "manual submit outside manual entry, ignoring");
                    Vec::new()
                } else {
                    let code = self.manual_input.clone();
                    self.lookup(&pog, &code)
                }
            }
            SessionAction::StartScan => {
                if self.mode == ViewMode::ScanBarcode {
                    self.start_scan()
                } else {
                    Vec::new()
                }
            }
            SessionAction::StopScan => self.stop_scan(),
            SessionAction::ScanDecoded(text) => match self.scanner.on_decoded(&text) {
                Some(code) => {
                    let mut effects = vec![Effect::ScanStopped];
                    effects.extend(self.lookup(&pog, &code));
                    effects
                }
                None => Vec::new(),
            },
            SessionAction::ScanFrameError(err) => {
                self.scanner.on_frame_error(&err);
                Vec::new()
            }
            SessionAction::TapProduct(product) => {
                self.redirect = None;
                self.product = Some(product.clone());
                vec![Effect::ShowProduct {
                    product,
                    redirect: None,
                }]
            }
            SessionAction::CloseProduct => self.hide_product(),
            SessionAction::OpenDocuments => {
                let viewer = DocumentViewer::open(&pog.pdf_url);
                let url = viewer.active().to_string();
                self.viewer = Some(viewer);
                vec![Effect::OpenDocument { url }]
            }
            SessionAction::CloseDocuments => self.close_viewer(),
            SessionAction::SelectDocument(kind) => match self.viewer.as_mut() {
                Some(viewer) => vec![Effect::OpenDocument {
                    url: viewer.select(kind).to_string(),
                }],
                None => Vec::new(),
            },
        };
        Ok(effects)
    }

    fn select_store(&mut self, store: &str) -> PogResult<Vec<Effect>> {
        let pog = self.dataset.planogram_for_store(store)?;
        let mut effects = self.stop_scan();
        effects.extend(self.hide_product());
        effects.extend(self.close_viewer());

        info!(store, planogram = %pog.id, "store selected");
        self.store = Some(store.to_string());
        self.mode = ViewMode::BrowseShelf;
        self.side = 1;
        self.filter = HighlightFilter::None;
        effects.push(Effect::RederiveLayout {
            planogram_id: pog.id.clone(),
            side: self.side,
        });
        self.planogram = Some(pog);
        Ok(effects)
    }

    fn change_store(&mut self) -> Vec<Effect> {
        let mut effects = self.stop_scan();
        effects.extend(self.hide_product());
        effects.extend(self.close_viewer());
        self.store = None;
        self.planogram = None;
        self.mode = ViewMode::BrowseShelf;
        effects.push(Effect::ShowStoreSelector);
        effects
    }

    fn select_tab(&mut self, mode: ViewMode) -> Vec<Effect> {
        if mode == self.mode {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if self.mode == ViewMode::ScanBarcode {
            effects.extend(self.stop_scan());
        }
        self.mode = mode;
        if mode == ViewMode::ScanBarcode {
            effects.extend(self.start_scan());
        }
        effects
    }

    fn select_side(&mut self, pog: &PlanogramMetadata, side: i64) -> Vec<Effect> {
        if !side_in_range(side, pog.sides) {
            debug!(side, sides = pog.sides, "side out of range, ignoring");
            return Vec::new();
        }
        if side == self.side {
            return Vec::new();
        }
        self.side = side;
        vec![Effect::RederiveLayout {
            planogram_id: pog.id.clone(),
            side,
        }]
    }

    fn lookup(&mut self, pog: &PlanogramMetadata, code: &str) -> Vec<Effect> {
        match resolve_product_impl(code, pog) {
            Ok(found) => {
                self.redirect = found.redirect_notice();
                self.product = Some(found.product.clone());
                vec![Effect::ShowProduct {
                    product: found.product,
                    redirect: self.redirect.clone(),
                }]
            }
            Err(err) => match &err {
                PogError::NotFound { code } => vec![Effect::NotFound {
                    code: code.clone(),
                    message: err.to_string(),
                }],
                _ => {
                    warn!(%err, "lookup failed");
                    Vec::new()
                }
            },
        }
    }

    fn start_scan(&mut self) -> Vec<Effect> {
        if self.scanner.is_active() {
            return Vec::new();
        }
        match self.scanner.start() {
            Ok(()) => vec![Effect::ScanStarted],
            Err(err) => {
                warn!(%err, "scanner failed to start");
                vec![Effect::DecodeSessionError {
                    message: err.to_string(),
                }]
            }
        }
    }

    fn stop_scan(&mut self) -> Vec<Effect> {
        if !self.scanner.is_active() {
            return Vec::new();
        }
        self.scanner.stop();
        vec![Effect::ScanStopped]
    }

    fn hide_product(&mut self) -> Vec<Effect> {
        self.redirect = None;
        match self.product.take() {
            Some(_) => vec![Effect::HideProduct],
            None => Vec::new(),
        }
    }

    fn close_viewer(&mut self) -> Vec<Effect> {
        match self.viewer.take() {
            Some(_) => vec![Effect::CloseDocument],
            None => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Python bindings
// ---------------------------------------------------------------------------

/// Decode backend driven by host callables. A missing start callable behaves
/// like a device without a camera.
#[cfg(feature = "python")]
struct PyCallbackBackend {
    on_start: Option<Py<PyAny>>,
    on_stop: Option<Py<PyAny>>,
}

#[cfg(feature = "python")]
impl DecodeBackend for PyCallbackBackend {
    fn start(&mut self) -> Result<(), String> {
        let Some(callback) = &self.on_start else {
            return Err("no camera available".to_string());
        };
        Python::with_gil(|py| callback.call0(py).map(|_| ()).map_err(|e| e.to_string()))
    }

    fn stop(&mut self) -> Result<(), String> {
        let Some(callback) = &self.on_stop else {
            return Ok(());
        };
        Python::with_gil(|py| callback.call0(py).map(|_| ()).map_err(|e| e.to_string()))
    }
}

#[cfg(feature = "python")]
#[pyclass(name = "Session", unsendable)]
pub struct PySession {
    inner: Session,
}

#[cfg(feature = "python")]
#[pymethods]
impl PySession {
    #[new]
    #[pyo3(signature = (dataset, on_scan_start=None, on_scan_stop=None))]
    fn py_new(
        dataset: PyRef<'_, Dataset>,
        on_scan_start: Option<Py<PyAny>>,
        on_scan_stop: Option<Py<PyAny>>,
    ) -> Self {
        let backend = PyCallbackBackend {
            on_start: on_scan_start,
            on_stop: on_scan_stop,
        };
        Self {
            inner: Session::new(Arc::new(Dataset::clone(&dataset)), Box::new(backend)),
        }
    }

    #[staticmethod]
    #[pyo3(name = "from_env", signature = (on_scan_start=None, on_scan_stop=None))]
    fn py_from_env(on_scan_start: Option<Py<PyAny>>, on_scan_stop: Option<Py<PyAny>>) -> PyResult<Self> {
        let backend = PyCallbackBackend {
            on_start: on_scan_start,
            on_stop: on_scan_stop,
        };
        Ok(Self {
            inner: Session::from_config(&PogConfig::from_env(), Box::new(backend))?,
        })
    }

    /// Apply a JSON-encoded action, e.g. `{"type": "select_side", "value": 2}`,
    /// and return the effects as Python objects.
    fn apply(&mut self, py: Python<'_>, action_json: &str) -> PyResult<PyObject> {
        let action: SessionAction = serde_json::from_str(action_json).map_err(PogError::from)?;
        let effects = self.inner.apply(action)?;
        let json_str = serde_json::to_string(&effects).map_err(PogError::from)?;
        let json_module = py.import("json")?;
        json_module
            .call_method1("loads", (json_str,))
            .map(|o| o.into())
    }

    #[getter]
    fn store(&self) -> Option<String> {
        self.inner.store().map(str::to_string)
    }

    #[getter]
    fn mode(&self) -> ViewMode {
        self.inner.mode()
    }

    #[getter]
    fn side(&self) -> i64 {
        self.inner.side()
    }

    #[getter]
    fn filter(&self) -> HighlightFilter {
        self.inner.filter()
    }

    #[getter]
    fn product(&self) -> Option<Product> {
        self.inner.product().cloned()
    }

    #[getter]
    fn redirect(&self) -> Option<RedirectNotice> {
        self.inner.redirect().cloned()
    }

    #[getter]
    fn manual_input(&self) -> String {
        self.inner.manual_input().to_string()
    }

    #[getter]
    fn is_scanning(&self) -> bool {
        self.inner.is_scanning()
    }

    #[getter]
    fn document_url(&self) -> Option<String> {
        self.inner.viewer().map(|v| v.active().to_string())
    }

    #[pyo3(name = "layout")]
    fn py_layout(&self) -> Vec<ShelfRow> {
        self.inner
            .layout()
            .map(|rows| rows.to_vec())
            .unwrap_or_default()
    }

    #[pyo3(name = "side_tabs")]
    fn py_side_tabs(&self) -> Vec<i64> {
        self.inner.side_tabs()
    }

    #[pyo3(name = "is_dimmed")]
    fn py_is_dimmed(&self, product: &Product) -> bool {
        self.inner.is_dimmed(product)
    }

    #[pyo3(name = "image_source")]
    fn py_image_source(&self, product: &Product) -> String {
        self.inner.image_source(product).as_str().to_string()
    }

    #[pyo3(name = "image_candidates")]
    fn py_image_candidates(&self, product: &Product) -> Vec<String> {
        let mut chain = self.inner.image_chain(product);
        let mut names = Vec::new();
        while !chain.is_exhausted() {
            names.push(chain.current().as_str().to_string());
            chain.fail();
        }
        names.push(chain.current().as_str().to_string());
        names
    }

    fn __repr__(&self) -> String {
        format!(
            "Session(store={:?}, mode={:?}, side={}, filter={:?})",
            self.inner.store(),
            self.inner.mode(),
            self.inner.side(),
            self.inner.filter(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::dataset::fixtures::sample;
    use crate::session::scanner::fixtures::CountingBackend;

    fn session() -> (Session, CountingBackend) {
        let backend = CountingBackend::default();
        let session = Session::new(Arc::new(sample()), Box::new(backend.clone()));
        (session, backend)
    }

    fn at_store(store: &str) -> (Session, CountingBackend) {
        let (mut session, backend) = session();
        session
            .apply(SessionAction::SelectStore(store.to_string()))
            .unwrap();
        (session, backend)
    }

    fn lookup_manual(session: &mut Session, code: &str) -> Vec<Effect> {
        session
            .apply(SessionAction::SelectTab(ViewMode::ManualEntry))
            .unwrap();
        session
            .apply(SessionAction::EditManualInput(code.to_string()))
            .unwrap();
        session.apply(SessionAction::SubmitManualInput).unwrap()
    }

    #[test]
    fn actions_before_store_selection_are_ignored() {
        let (mut session, _) = session();
        let effects = session.apply(SessionAction::SelectSide(2)).unwrap();
        assert!(effects.is_empty());
        assert!(session.layout().is_none());
        assert!(session.side_tabs().is_empty());
    }

    #[test]
    fn unknown_store_is_an_error() {
        let (mut session, _) = session();
        let err = session
            .apply(SessionAction::SelectStore("9999".to_string()))
            .unwrap_err();
        assert!(matches!(err, PogError::UnknownStore(_)));
        assert!(session.store().is_none());
    }

    #[test]
    fn selecting_store_resets_view_state() {
        let (mut session, _) = at_store("2203");
        session.apply(SessionAction::SelectSide(3)).unwrap();
        session
            .apply(SessionAction::SetFilter(HighlightFilter::SrpOnly))
            .unwrap();
        lookup_manual(&mut session, "0072140011111");
        assert!(session.product().is_some());

        let effects = session
            .apply(SessionAction::SelectStore("0412".to_string()))
            .unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::HideProduct,
                Effect::RederiveLayout {
                    planogram_id: "endcap".to_string(),
                    side: 1
                },
            ]
        );
        assert_eq!(session.mode(), ViewMode::BrowseShelf);
        assert_eq!(session.side(), 1);
        assert_eq!(session.filter(), HighlightFilter::None);
        assert!(session.product().is_none());
        assert!(session.redirect().is_none());
    }

    #[test]
    fn browse_keeps_side_and_filter() {
        let (mut session, _) = at_store("2203");
        session.apply(SessionAction::SelectSide(2)).unwrap();
        session
            .apply(SessionAction::SetFilter(HighlightFilter::NewItemsOnly))
            .unwrap();
        session
            .apply(SessionAction::SelectTab(ViewMode::ManualEntry))
            .unwrap();
        session
            .apply(SessionAction::SelectTab(ViewMode::BrowseShelf))
            .unwrap();
        assert_eq!(session.side(), 2);
        assert_eq!(session.filter(), HighlightFilter::NewItemsOnly);
    }

    #[test]
    fn side_change_rederives_layout() {
        let (mut session, _) = at_store("2203");
        let effects = session.apply(SessionAction::SelectSide(4)).unwrap();
        assert_eq!(
            effects,
            vec![Effect::RederiveLayout {
                planogram_id: "pallet".to_string(),
                side: 4
            }]
        );
        let layout = session.layout().unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].products[0].upc, "0011110666666");
        assert_eq!(session.side_tabs(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_side_is_ignored() {
        let (mut session, _) = at_store("0412");
        assert!(session.apply(SessionAction::SelectSide(2)).unwrap().is_empty());
        assert!(session.apply(SessionAction::SelectSide(0)).unwrap().is_empty());
        assert_eq!(session.side(), 1);
        assert!(session.side_tabs().is_empty());
    }

    #[test]
    fn manual_lookup_through_redirect_shows_notice() {
        let (mut session, _) = at_store("0412");
        let effects = lookup_manual(&mut session, "0072140019061");
        let notice = RedirectNotice {
            old_upc: "0072140019061".to_string(),
            new_upc: "0072140019078".to_string(),
        };
        match &effects[..] {
            [Effect::ShowProduct { product, redirect }] => {
                assert_eq!(product.upc, "0072140019078");
                assert_eq!(redirect.as_ref(), Some(&notice));
            }
            other => panic!("unexpected effects: {other:?}"),
        }
        assert_eq!(session.redirect(), Some(&notice));
    }

    #[test]
    fn manual_lookup_miss_emits_notice_and_keeps_state() {
        let (mut session, _) = at_store("0412");
        lookup_manual(&mut session, "0086800000817");
        let effects = lookup_manual(&mut session, "99-99");
        assert_eq!(
            effects,
            vec![Effect::NotFound {
                code: "9999".to_string(),
                message: "Product not found: 9999".to_string(),
            }]
        );
        assert_eq!(session.product().unwrap().upc, "0086800000817");
    }

    #[test]
    fn plain_lookup_after_redirect_clears_notice() {
        let (mut session, _) = at_store("0412");
        lookup_manual(&mut session, "0072140019061");
        assert!(session.redirect().is_some());

        let effects = lookup_manual(&mut session, "0086800000817");
        assert!(matches!(
            &effects[..],
            [Effect::ShowProduct { redirect: None, .. }]
        ));
        assert_eq!(session.product().unwrap().upc, "0086800000817");
        assert!(session.redirect().is_none());
    }

    #[test]
    fn miss_after_redirect_keeps_notice_and_product() {
        let (mut session, _) = at_store("0412");
        lookup_manual(&mut session, "0072140019061");
        let notice = session.redirect().cloned();
        assert!(notice.is_some());

        let effects = lookup_manual(&mut session, "4242");
        assert!(matches!(&effects[..], [Effect::NotFound { .. }]));
        assert_eq!(session.redirect().cloned(), notice);
        assert_eq!(session.product().unwrap().upc, "0072140019078");
    }

    #[test]
    fn manual_submit_outside_manual_mode_is_ignored() {
        let (mut session, _) = at_store("0412");
        session
            .apply(SessionAction::EditManualInput("0086800000817".to_string()))
            .unwrap();
        assert!(session
            .apply(SessionAction::SubmitManualInput)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn manual_input_is_bounded() {
        let (mut session, _) = at_store("0412");
        session
            .apply(SessionAction::EditManualInput("1".repeat(500)))
            .unwrap();
        assert_eq!(
            session.manual_input().len(),
            crate::query::guards::MAX_CODE_INPUT_LENGTH
        );
    }

    #[test]
    fn tapping_product_clears_redirect_notice() {
        let (mut session, _) = at_store("0412");
        lookup_manual(&mut session, "0072140019061");
        assert!(session.redirect().is_some());

        let tapped = session.planogram().unwrap().products[2].clone();
        let effects = session
            .apply(SessionAction::TapProduct(tapped.clone()))
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::ShowProduct {
                product: tapped,
                redirect: None
            }]
        );
        assert!(session.redirect().is_none());

        assert_eq!(
            session.apply(SessionAction::CloseProduct).unwrap(),
            vec![Effect::HideProduct]
        );
        assert!(session.product().is_none());
    }

    #[test]
    fn scan_tab_starts_and_leaving_stops() {
        let (mut session, backend) = at_store("0412");
        let effects = session
            .apply(SessionAction::SelectTab(ViewMode::ScanBarcode))
            .unwrap();
        assert_eq!(effects, vec![Effect::ScanStarted]);
        assert!(session.is_scanning());

        let effects = session
            .apply(SessionAction::SelectTab(ViewMode::BrowseShelf))
            .unwrap();
        assert_eq!(effects, vec![Effect::ScanStopped]);
        assert!(!session.is_scanning());
        assert_eq!((backend.starts(), backend.stops()), (1, 1));
    }

    #[test]
    fn first_decode_wins() {
        let (mut session, backend) = at_store("0412");
        session
            .apply(SessionAction::SelectTab(ViewMode::ScanBarcode))
            .unwrap();
        session
            .apply(SessionAction::ScanFrameError("blurry".to_string()))
            .unwrap();
        let effects = session
            .apply(SessionAction::ScanDecoded("086800000817".to_string()))
            .unwrap();
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::ScanStopped);
        assert!(matches!(&effects[1], Effect::ShowProduct { product, .. } if product.upc == "0086800000817"));

        let late = session
            .apply(SessionAction::ScanDecoded("0072140098760".to_string()))
            .unwrap();
        assert!(late.is_empty());
        assert_eq!(session.product().unwrap().upc, "0086800000817");
        assert_eq!(backend.stops(), 1);
        assert_eq!(session.mode(), ViewMode::ScanBarcode);
    }

    #[test]
    fn scanner_start_failure_stays_in_scan_mode_for_retry() {
        let backend = CountingBackend {
            refuse: true,
            ..Default::default()
        };
        let mut session = Session::new(Arc::new(sample()), Box::new(backend));
        session
            .apply(SessionAction::SelectStore("0412".to_string()))
            .unwrap();
        let effects = session
            .apply(SessionAction::SelectTab(ViewMode::ScanBarcode))
            .unwrap();
        assert!(matches!(&effects[..], [Effect::DecodeSessionError { .. }]));
        assert_eq!(session.mode(), ViewMode::ScanBarcode);
        assert!(!session.is_scanning());

        let retry = session.apply(SessionAction::StartScan).unwrap();
        assert!(matches!(&retry[..], [Effect::DecodeSessionError { .. }]));
    }

    #[test]
    fn changing_store_releases_scanner() {
        let (mut session, backend) = at_store("0412");
        session
            .apply(SessionAction::SelectTab(ViewMode::ScanBarcode))
            .unwrap();
        let effects = session.apply(SessionAction::ChangeStore).unwrap();
        assert_eq!(effects, vec![Effect::ScanStopped, Effect::ShowStoreSelector]);
        assert_eq!(backend.stops(), 1);
        assert!(session.store().is_none());
        assert!(session.layout().is_none());
    }

    #[test]
    fn dropping_session_releases_scanner() {
        let (mut session, backend) = at_store("0412");
        session
            .apply(SessionAction::SelectTab(ViewMode::ScanBarcode))
            .unwrap();
        drop(session);
        assert_eq!(backend.stops(), 1);
    }

    #[test]
    fn document_viewer_opens_on_planogram_pdf() {
        let (mut session, _) = at_store("2203");
        assert_eq!(
            session.apply(SessionAction::OpenDocuments).unwrap(),
            vec![Effect::OpenDocument {
                url: "pallet.pdf".to_string()
            }]
        );
        assert_eq!(
            session
                .apply(SessionAction::SelectDocument(DocumentKind::Endcap))
                .unwrap(),
            vec![Effect::OpenDocument {
                url: "endcap.pdf".to_string()
            }]
        );
        assert_eq!(
            session.apply(SessionAction::CloseDocuments).unwrap(),
            vec![Effect::CloseDocument]
        );
        assert!(session
            .apply(SessionAction::SelectDocument(DocumentKind::Pallet))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn filter_dims_without_hiding() {
        let (mut session, _) = at_store("0412");
        session
            .apply(SessionAction::SetFilter(HighlightFilter::NewItemsOnly))
            .unwrap();
        let layout = session.layout().unwrap();
        let all: Vec<&Product> = layout.iter().flat_map(|row| &row.products).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all.iter().filter(|p| !session.is_dimmed(p)).count(), 2);
    }

    #[test]
    fn image_source_prefers_explicit_url() {
        let (session, _) = at_store("0412");
        let mut product = session.planogram().unwrap().products[0].clone();
        assert_eq!(
            session.image_source(&product),
            ImageSource::Candidate("/72140019078.webp".to_string())
        );
        product.image_url = Some("https://cdn.test/x.png".to_string());
        assert_eq!(session.image_source(&product).as_str(), "https://cdn.test/x.png");
    }

    #[test]
    fn from_config_loads_dataset_and_cache_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, crate::catalog::dataset::fixtures::SAMPLE_JSON).unwrap();
        let config = PogConfig {
            data_dir: Some(path),
            layout_cache_size: 2,
            ..PogConfig::default()
        };
        let mut session =
            Session::from_config(&config, Box::new(CountingBackend::default())).unwrap();
        session
            .apply(SessionAction::SelectStore("1187".to_string()))
            .unwrap();
        for side in 1..=4 {
            session.apply(SessionAction::SelectSide(side)).unwrap();
            session.layout().unwrap();
        }
        assert_eq!(session.layouts.stats().entries, 2);
    }

    #[test]
    fn actions_decode_from_tagged_json() {
        let action: SessionAction =
            serde_json::from_str(r#"{"type":"select_side","value":2}"#).unwrap();
        assert_eq!(action, SessionAction::SelectSide(2));
        let action: SessionAction = serde_json::from_str(r#"{"type":"close_product"}"#).unwrap();
        assert_eq!(action, SessionAction::CloseProduct);
    }

    #[test]
    fn effects_serialize_with_effect_tag() {
        let value = serde_json::to_value(Effect::RederiveLayout {
            planogram_id: "endcap".to_string(),
            side: 1,
        })
        .unwrap();
        assert_eq!(value["effect"], "rederive_layout");
        assert_eq!(value["planogram_id"], "endcap");
    }
}
