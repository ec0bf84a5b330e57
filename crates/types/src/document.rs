//! Workflow-significant document kinds.

use serde::{Deserialize, Serialize};

/// Closed set of uploaded document types that can advance the workflow.
///
/// Uploads declare a type tag; tags outside this set have no workflow
/// significance and parse to `None`; for the advancer that is an
/// informational outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "agreement-document")]
    Agreement,
    #[serde(rename = "purchase-order-document")]
    PurchaseOrder,
    #[serde(rename = "closure-document")]
    Closure,
}

impl DocumentKind {
    /// Parse a declared upload type tag. Exact match only: no substring
    /// or pattern matching on file type strings.
    pub fn from_type_tag(tag: &str) -> Option<DocumentKind> {
        match tag {
            "agreement-document" => Some(DocumentKind::Agreement),
            "purchase-order-document" => Some(DocumentKind::PurchaseOrder),
            "closure-document" => Some(DocumentKind::Closure),
            _ => None,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            DocumentKind::Agreement => "agreement-document",
            DocumentKind::PurchaseOrder => "purchase-order-document",
            DocumentKind::Closure => "closure-document",
        }
    }
}
