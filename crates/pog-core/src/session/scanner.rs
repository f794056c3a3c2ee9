//! Scan session lifecycle around the external barcode decoder.
//!
//! The decoder itself is a black box behind [`DecodeBackend`]. The
//! controller holds at most one active decode session and releases it on
//! every exit path, including drop.

use tracing::{debug, trace, warn};

use crate::errors::{PogError, PogResult};

/// Camera-backed decoder supplied by the host.
pub trait DecodeBackend: Send {
    /// Acquire the camera and begin continuous decoding.
    fn start(&mut self) -> Result<(), String>;
    /// Stop decoding and release the camera.
    fn stop(&mut self) -> Result<(), String>;
}

/// Backend for hosts without a camera; starting always fails.
#[derive(Debug, Default)]
pub struct NoCamera;

impl DecodeBackend for NoCamera {
    fn start(&mut self) -> Result<(), String> {
        Err("no camera available".to_string())
    }

    fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }
}

pub struct ScanController {
    backend: Box<dyn DecodeBackend>,
    active: bool,
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl ScanController {
    pub fn new(backend: Box<dyn DecodeBackend>) -> Self {
        Self {
            backend,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start a decode session. A second start while active is a no-op.
    pub fn start(&mut self) -> PogResult<()> {
        if self.active {
            trace!("scan already active");
            return Ok(());
        }
        self.backend.start().map_err(PogError::DecodeSession)?;
        self.active = true;
        debug!("scan session started");
        Ok(())
    }

    /// Stop the active session, if any. A backend failure is logged and the
    /// session still counts as released.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        match self.backend.stop() {
            Ok(()) => debug!("scan session stopped"),
            Err(err) => warn!(%err, "failed to stop scanner"),
        }
    }

    /// Handle decoded text from the backend.
    ///
    /// The first read of an active session stops it and returns the text;
    /// reads arriving with no active session are dropped.
    pub fn on_decoded(&mut self, text: &str) -> Option<String> {
        if !self.active {
            trace!("decode result after session ended, ignoring");
            return None;
        }
        self.stop();
        Some(text.to_string())
    }

    /// Per-frame decode failures are expected on unreadable frames.
    pub fn on_frame_error(&self, err: &str) {
        trace!(%err, "frame not decoded");
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.stop();
    }
}
