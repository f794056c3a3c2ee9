//! Planogram document viewer selection.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Endcap,
    Pallet,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Endcap, DocumentKind::Pallet];

    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Endcap => "endcap.pdf",
            DocumentKind::Pallet => "pallet.pdf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Endcap => "Endcap",
            DocumentKind::Pallet => "Pallet",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.file_name() == name)
    }
}

/// Open viewer state; dropped when the viewer closes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentViewer {
    active: String,
}

impl DocumentViewer {
    /// Open on the planogram's own document.
    pub fn open(default_url: &str) -> Self {
        Self {
            active: default_url.to_string(),
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn active_kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_file_name(&self.active)
    }

    pub fn select(&mut self, kind: DocumentKind) -> &str {
        self.active = kind.file_name().to_string();
        &self.active
    }

    /// Label for the download fallback when inline rendering is refused.
    pub fn download_label(&self) -> String {
        let which = self.active_kind().unwrap_or(DocumentKind::Pallet);
        format!("Download {} Planogram", which.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_on_default_and_switches_between_fixed_documents() {
        let mut viewer = DocumentViewer::open("endcap.pdf");
        assert_eq!(viewer.active_kind(), Some(DocumentKind::Endcap));
        assert_eq!(viewer.select(DocumentKind::Pallet), "pallet.pdf");
        assert_eq!(viewer.download_label(), "Download Pallet Planogram");
    }

    #[test]
    fn custom_default_has_no_kind() {
        let viewer = DocumentViewer::open("https://cdn.test/pog-51234.pdf");
        assert_eq!(viewer.active_kind(), None);
        assert_eq!(viewer.active(), "https://cdn.test/pog-51234.pdf");
    }
}
