pub mod nowpayments;
pub mod telegram;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;

type HmacSha512 = Hmac<Sha512>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerifySignatureError {
    #[error("Signature verification is not configured")]
    NotConfigured,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Checks a hex-encoded HMAC-SHA512 of `body` against `provided_signature`.
///
/// An empty secret fails closed: a request can never pass verification just
/// because the secret was left unset.
pub fn validate_signature(
    provided_signature: &str,
    secret: &str,
    body: &[u8],
) -> Result<(), VerifySignatureError> {
    if secret.is_empty() {
        return Err(VerifySignatureError::NotConfigured);
    }

    let decoded =
        hex::decode(provided_signature).map_err(|_| VerifySignatureError::InvalidSignature)?;

    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");

    mac.update(body);

    // Constant-time comparison.
    mac.verify_slice(&decoded).map_err(|_| VerifySignatureError::InvalidSignature)
}
