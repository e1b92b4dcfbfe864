use anyhow::{anyhow, Context};
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use sha2::{Digest, Sha256};

pub fn sha256sum(inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Decode a P-256 public key stored as the raw 64-byte X||Y blob used inside quotes.
pub fn verifying_key_from_raw(raw: &[u8; 64]) -> anyhow::Result<VerifyingKey> {
    let mut key = [0u8; 65];
    key[0] = 4;
    key[1..].copy_from_slice(raw);
    VerifyingKey::from_sec1_bytes(&key).map_err(|e| anyhow!("failed to parse raw p256 key: {e}"))
}

/// Verify a raw (r||s, 64 bytes) ECDSA-P256 signature over SHA-256(`data`).
pub fn verify_p256_signature(key: &VerifyingKey, data: &[u8], signature: &[u8]) -> anyhow::Result<()> {
    let signature = Signature::from_slice(signature).context("malformed ecdsa signature")?;
    key.verify(data, &signature)
        .map_err(|e| anyhow!("ecdsa signature mismatch: {e}"))
}
