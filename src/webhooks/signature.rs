use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Seconds a payment webhook timestamp may drift from our clock.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignatureError {
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),
    #[error("Signature does not match payload")]
    Mismatch,
    #[error("Signature timestamp is {age_secs}s away from now")]
    Expired { age_secs: i64 },
    #[error("Signing key rejected")]
    InvalidKey,
}

fn mac(key: &[u8]) -> Result<HmacSha256, SignatureError> {
    <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)
}

/// Checks a `t=<unix>,v1=<hex>` header against `"<t>.<body>"`. Any of
/// several `v1` entries may match, which allows secret rotation.
pub fn verify_payment_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or_else(|| SignatureError::MalformedHeader(format!("segment without '=': {:?}", part)))?;
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let raw_timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".to_string()))?;
    let issued_at: i64 = raw_timestamp
        .parse()
        .map_err(|_| SignatureError::MalformedHeader(format!("timestamp is not an integer: {:?}", raw_timestamp)))?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader("missing v1 signature".to_string()));
    }

    let age_secs = now - issued_at;
    if age_secs.abs() > tolerance_secs {
        return Err(SignatureError::Expired { age_secs });
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else { continue };
        let mut mac = mac(secret.as_bytes())?;
        mac.update(raw_timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

/// Checks a base64 HMAC-SHA256 over `notification_url + body`.
pub fn verify_pos_signature(
    payload: &[u8],
    header: &str,
    signature_key: &str,
    notification_url: &str,
) -> Result<(), SignatureError> {
    let expected = STANDARD
        .decode(header.trim())
        .map_err(|e| SignatureError::MalformedHeader(format!("signature is not base64: {}", e)))?;
    let mut mac = mac(signature_key.as_bytes())?;
    mac.update(notification_url.as_bytes());
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Builds a payment signature header, as the provider would send it.
#[cfg(test)]
pub fn sign_payment_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = mac(secret.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
pub fn sign_pos_payload(payload: &[u8], signature_key: &str, notification_url: &str) -> String {
    let mut mac = mac(signature_key.as_bytes()).unwrap();
    mac.update(notification_url.as_bytes());
    mac.update(payload);
    STANDARD.encode(mac.finalize().into_bytes())
}
