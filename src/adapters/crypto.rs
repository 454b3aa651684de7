//! Crypto adapter (C9).
//!
//! Sign/Verify/Hash/RandomBytes/GenerateKeyPair plus trust-chain resolution,
//! per spec §6. The kernel never implements cryptographic primitives itself
//! (Non-goals, §1) — this module is a thin trait plus one test-grade
//! implementation, mirroring the teacher's split between
//! `enterprise::crypto::*` services and the code that calls them.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trust level of a signer in a document's trust chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustLevel {
    /// Built into the kernel's deployment.
    System,
    /// Trusted by the hosting organization.
    Organization,
    /// Self-asserted by the document's own author.
    User,
}

/// A single signer in a document's ordered trust chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerDescriptor {
    /// Signer identifier.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Public key, hex-encoded.
    pub public_key: String,
    /// Validity window start.
    pub valid_from: DateTime<Utc>,
    /// Validity window end.
    pub valid_until: DateTime<Utc>,
    /// Whether this signer has been revoked.
    pub revoked: bool,
    /// Trust level of this signer.
    pub trust_level: TrustLevel,
}

impl SignerDescriptor {
    /// Whether this signer is usable at the given instant: not revoked and
    /// within its validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        !self.revoked && at >= self.valid_from && at <= self.valid_until
    }
}

/// Crypto adapter contract consumed by the permission broker's trust-chain
/// verification and by any caller that needs to check a document signature.
pub trait CryptoAdapter: Send + Sync {
    /// Sign `bytes` with the named key, returning a hex-encoded signature.
    fn sign(&self, bytes: &[u8], key_id: &str) -> Result<String, String>;

    /// Verify a hex-encoded signature over `bytes` against the named key.
    fn verify(&self, bytes: &[u8], signature_hex: &str, key_id: &str) -> bool;

    /// Content hash, hex-encoded (BLAKE3).
    fn hash(&self, bytes: &[u8]) -> String;

    /// Cryptographically random bytes.
    fn random_bytes(&self, n: usize) -> Vec<u8>;

    /// Ordered list of signers for a document, from the leaf signature up
    /// to a signer the deployment trusts. Empty if the document is
    /// unsigned or the trust chain cannot be resolved.
    fn trust_chain(&self, document_id: &str) -> Vec<SignerDescriptor>;
}

/// Test-grade Ed25519 crypto adapter. Keys and registered trust chains live
/// in memory; this is not meant for production key custody (that remains an
/// external HSM/vault concern per spec's Non-goals).
pub struct Ed25519CryptoAdapter {
    keys: parking_lot::RwLock<HashMap<String, SigningKey>>,
    trust_chains: parking_lot::RwLock<HashMap<String, Vec<SignerDescriptor>>>,
}

impl Ed25519CryptoAdapter {
    /// Create an adapter with no registered keys or trust chains.
    pub fn new() -> Self {
        Self {
            keys: parking_lot::RwLock::new(HashMap::new()),
            trust_chains: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    /// Generate and register a new signing key under `key_id`, returning its
    /// hex-encoded public key.
    pub fn generate_key_pair(&self, key_id: impl Into<String>) -> String {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let public_hex = hex::encode(signing_key.verifying_key().to_bytes());
        self.keys.write().insert(key_id.into(), signing_key);
        public_hex
    }

    /// Register the trust chain a document should resolve to.
    pub fn register_trust_chain(&self, document_id: impl Into<String>, chain: Vec<SignerDescriptor>) {
        self.trust_chains.write().insert(document_id.into(), chain);
    }
}

impl Default for Ed25519CryptoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoAdapter for Ed25519CryptoAdapter {
    fn sign(&self, bytes: &[u8], key_id: &str) -> Result<String, String> {
        let keys = self.keys.read();
        let key = keys
            .get(key_id)
            .ok_or_else(|| format!("unknown key: {key_id}"))?;
        let sig: Signature = key.sign(bytes);
        Ok(hex::encode(sig.to_bytes()))
    }

    fn verify(&self, bytes: &[u8], signature_hex: &str, key_id: &str) -> bool {
        let keys = self.keys.read();
        let Some(key) = keys.get(key_id) else {
            return false;
        };
        let verifying_key: VerifyingKey = key.verifying_key();
        let Ok(sig_bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
            return false;
        };
        let sig = Signature::from_bytes(&sig_array);
        verifying_key.verify(bytes, &sig).is_ok()
    }

    fn hash(&self, bytes: &[u8]) -> String {
        blake3::hash(bytes).to_hex().to_string()
    }

    fn random_bytes(&self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        OsRng.fill_bytes(&mut buf);
        buf
    }

    fn trust_chain(&self, document_id: &str) -> Vec<SignerDescriptor> {
        self.trust_chains
            .read()
            .get(document_id)
            .cloned()
            .unwrap_or_default()
    }
}
