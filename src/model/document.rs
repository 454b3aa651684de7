//! Document model: the fields the kernel reads from an archive.
//!
//! The archive container format itself is out of scope (§1 Non-goals);
//! this struct is the opaque view the kernel needs, grounded in how the
//! teacher's `enterprise::marketplace::sandbox::SandboxedPlugin` treats a
//! plugin bundle as an already-parsed set of fields rather than raw bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single file entry in a document's resource manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub hash: String,
    pub byte_size: u64,
    pub mime_type: String,
}

/// Optional signature bundle attached to a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureBundle {
    pub content_signature: Option<String>,
    pub manifest_signature: Option<String>,
    pub module_signatures: HashMap<String, String>,
}

/// Document metadata the kernel reads for audit/event context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A document as the kernel sees it: opaque content fields plus the
/// structural data the evaluation engine and broker need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub metadata: DocumentMetadata,
    /// Embedded markup content.
    pub markup: String,
    /// Embedded style content.
    pub style: String,
    /// Embedded script-like spec content (not executed by the kernel).
    pub script_spec: String,
    /// Static fallback content shown when guest modules cannot run.
    pub static_fallback: String,
    /// Asset maps: category (images/fonts/data) -> path -> bytes length.
    pub assets: HashMap<String, HashMap<String, u64>>,
    pub manifest: Vec<ManifestEntry>,
    /// Guest-module bytes by module name.
    pub guest_modules: HashMap<String, Vec<u8>>,
    pub signatures: Option<SignatureBundle>,
}

impl Document {
    /// Total byte size: markup + style + script_spec + static_fallback +
    /// guest module bytes + manifest byte sizes. Used by the admin-controls
    /// and resource-budget checks.
    pub fn total_byte_size(&self) -> u64 {
        let content = self.markup.len()
            + self.style.len()
            + self.script_spec.len()
            + self.static_fallback.len();
        let modules: usize = self.guest_modules.values().map(Vec::len).sum();
        let manifest: u64 = self.manifest.iter().map(|e| e.byte_size).sum();
        content as u64 + modules as u64 + manifest
    }

    /// Number of guest modules embedded in the document.
    pub fn guest_module_count(&self) -> usize {
        self.guest_modules.len()
    }

    /// All textual content the evaluation engine scans for tokens and
    /// keywords: markup, style, and script spec concatenated.
    pub fn scannable_text(&self) -> String {
        format!("{}\n{}\n{}", self.markup, self.style, self.script_spec)
    }

    pub fn has_content_signature(&self) -> bool {
        self.signatures
            .as_ref()
            .and_then(|s| s.content_signature.as_ref())
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        Document {
            id: "doc-1".into(),
            metadata: DocumentMetadata {
                title: "Sample".into(),
                author: "author-1".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            markup: "<div>hi</div>".into(),
            style: "div{color:red}".into(),
            script_spec: String::new(),
            static_fallback: String::new(),
            assets: HashMap::new(),
            manifest: Vec::new(),
            guest_modules: HashMap::new(),
            signatures: None,
        }
    }

    #[test]
    fn test_total_byte_size_sums_content() {
        let doc = sample_document();
        let expected = doc.markup.len() as u64 + doc.style.len() as u64;
        assert_eq!(doc.total_byte_size(), expected);
    }

    #[test]
    fn test_no_signature_by_default() {
        assert!(!sample_document().has_content_signature());
    }

    #[test]
    fn test_has_content_signature_when_present() {
        let mut doc = sample_document();
        doc.signatures = Some(SignatureBundle {
            content_signature: Some("deadbeef".into()),
            ..Default::default()
        });
        assert!(doc.has_content_signature());
    }
}
