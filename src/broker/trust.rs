//! Trust-chain verification for signature-gated documents (§4.3).
//!
//! The broker never implements signature cryptography itself (Non-goals,
//! §1); it only decides what an empty or unresolved chain means for a
//! permission grant.

use crate::adapters::crypto::{CryptoAdapter, SignerDescriptor};
use chrono::{DateTime, Utc};

/// Outcome of resolving a document's trust chain at `at`.
pub(crate) struct TrustOutcome {
    pub valid: bool,
    pub chain: Vec<SignerDescriptor>,
}

/// Resolve and validate `document_id`'s trust chain. Valid means non-empty
/// and every signer in the chain is usable at `at` (not revoked, within its
/// validity window).
pub(crate) fn verify_trust_chain(
    crypto: &dyn CryptoAdapter,
    document_id: &str,
    at: DateTime<Utc>,
) -> TrustOutcome {
    let chain = crypto.trust_chain(document_id);
    let valid = !chain.is_empty() && chain.iter().all(|signer| signer.is_valid_at(at));
    TrustOutcome { valid, chain }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::crypto::{Ed25519CryptoAdapter, TrustLevel};

    fn signer(revoked: bool) -> SignerDescriptor {
        let now = Utc::now();
        SignerDescriptor {
            id: "signer-1".to_string(),
            display_name: "Signer One".to_string(),
            public_key: "deadbeef".to_string(),
            valid_from: now - chrono::Duration::days(1),
            valid_until: now + chrono::Duration::days(1),
            revoked,
            trust_level: TrustLevel::Organization,
        }
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        let crypto = Ed25519CryptoAdapter::new();
        let outcome = verify_trust_chain(&crypto, "doc-1", Utc::now());
        assert!(!outcome.valid);
    }

    #[test]
    fn test_revoked_signer_invalidates_chain() {
        let crypto = Ed25519CryptoAdapter::new();
        crypto.register_trust_chain("doc-1", vec![signer(true)]);
        let outcome = verify_trust_chain(&crypto, "doc-1", Utc::now());
        assert!(!outcome.valid);
    }

    #[test]
    fn test_valid_chain_passes() {
        let crypto = Ed25519CryptoAdapter::new();
        crypto.register_trust_chain("doc-1", vec![signer(false)]);
        let outcome = verify_trust_chain(&crypto, "doc-1", Utc::now());
        assert!(outcome.valid);
    }
}
