//! Field repair utilities
//!
//! Every decoder leans on this module for the messy parts of share-link
//! encodings: base64 blobs with or without padding, URL-safe alphabets,
//! REALITY public keys that lost their trailing `=`, and hex short ids.

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use tracing::trace;

use crate::node::RealityOptions;

// ============================================================================
// Base64 Decoding
// ============================================================================

/// Decodes base64 content, trying multiple variants
///
/// Attempts to decode the content using:
/// 1. Standard base64
/// 2. URL-safe base64
/// 3. URL-safe base64 without padding
/// 4. Standard/URL-safe with padding added
///
/// Whitespace in the input is automatically removed before decoding.
pub fn decode_base64(content: &str) -> Result<Vec<u8>> {
    // Remove all whitespace (handles line breaks within base64)
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    trace!(
        "Attempting base64 decode, cleaned length: {} bytes",
        cleaned.len()
    );

    if let Ok(decoded) = STANDARD.decode(&cleaned) {
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE.decode(&cleaned) {
        return Ok(decoded);
    }

    if let Ok(decoded) = URL_SAFE_NO_PAD.decode(&cleaned) {
        return Ok(decoded);
    }

    // Try with padding added if needed
    let padded = add_base64_padding(&cleaned);
    if let Ok(decoded) = STANDARD.decode(&padded) {
        return Ok(decoded);
    }
    if let Ok(decoded) = URL_SAFE.decode(&padded) {
        return Ok(decoded);
    }

    bail!("Failed to decode base64 content")
}

/// Decodes base64 content into a UTF-8 string
pub fn decode_base64_utf8(content: &str) -> Result<String> {
    let decoded = decode_base64(content)?;
    String::from_utf8(decoded).context("Decoded base64 content is not valid UTF-8")
}

/// Adds proper padding to a base64 string if missing
pub fn add_base64_padding(s: &str) -> String {
    let mut result = s.to_string();
    while !result.len().is_multiple_of(4) {
        result.push('=');
    }
    result
}

// ============================================================================
// REALITY Parameter Repair
// ============================================================================

/// Expected length of a decoded REALITY public key (X25519).
const REALITY_PUBLIC_KEY_LEN: usize = 32;

/// Maximum length of a decoded REALITY short id.
const REALITY_SHORT_ID_MAX_LEN: usize = 8;

/// Validates a REALITY parameter pair into an all-or-nothing options block.
///
/// The public key is repaired to valid base64 padding and must decode to a
/// 32-byte X25519 key; the short id must be hex of at most 8 bytes. Both
/// must be non-empty. Callers drop `reality-opts` entirely on any failure
/// rather than emitting a half-populated block.
pub fn validate_reality(public_key: &str, short_id: &str) -> Result<RealityOptions> {
    if public_key.is_empty() {
        bail!("REALITY public key is empty");
    }
    if short_id.is_empty() {
        bail!("REALITY short id is empty");
    }

    let padded = add_base64_padding(public_key);
    let key = STANDARD
        .decode(&padded)
        .map_err(|e| anyhow!("REALITY public key is not valid base64: {}", e))?;
    if key.len() != REALITY_PUBLIC_KEY_LEN {
        bail!(
            "REALITY public key decodes to {} bytes, expected {}",
            key.len(),
            REALITY_PUBLIC_KEY_LEN
        );
    }

    let sid = hex::decode(short_id)
        .map_err(|e| anyhow!("REALITY short id is not valid hex: {}", e))?;
    if sid.len() > REALITY_SHORT_ID_MAX_LEN {
        bail!(
            "REALITY short id is {} bytes, maximum is {}",
            sid.len(),
            REALITY_SHORT_ID_MAX_LEN
        );
    }

    Ok(RealityOptions {
        public_key: padded,
        short_id: short_id.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
