use ed25519_dalek::{PUBLIC_KEY_LENGTH, Signature, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::FaultKind;

pub(super) fn blake3_hash<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().as_bytes().to_vec()
}

pub(super) fn sha256_hash<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// A public key of the wrong size is a fault, any other malformed input just fails to verify.
pub(super) fn valid_signature_ed25519(
    message: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<bool, FaultKind> {
    let key: [u8; PUBLIC_KEY_LENGTH] =
        public_key
            .try_into()
            .map_err(|_| FaultKind::WrongOperandLength {
                expected: PUBLIC_KEY_LENGTH,
                found: public_key.len(),
            })?;
    let Ok(key) = VerifyingKey::from_bytes(&key) else {
        return Ok(false);
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(key.verify_strict(message, &signature).is_ok())
}
