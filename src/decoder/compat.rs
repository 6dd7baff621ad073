//! Compatibility tables and decoder configuration
//!
//! Fixed lookup data shared by every decoder: the cipher allow-list that
//! Clash- and sing-box-class clients both accept, the VMess security
//! vocabulary, and the XTLS flow name map. The tables are bundled into
//! [`DecoderConfig`], built once by the caller and threaded through decode
//! calls by reference — there are no module-level globals.

use std::collections::HashMap;

// ============================================================================
// Tables
// ============================================================================

/// Ciphers supported by both Clash and sing-box, gating SS and SSR nodes.
pub const SUPPORTED_CIPHERS: [&str; 8] = [
    "rc4-md5",
    "aes-128-cfb",
    "aes-128-gcm",
    "aes-256-gcm",
    "aes-256-cfb",
    "chacha20-ietf-poly1305",
    "2022-blake3-aes-128-gcm",
    "2022-blake3-aes-256-gcm",
];

/// VMess `security` values accepted by common clients.
///
/// Checked after the `none` → `auto` normalization, so `none` never reaches
/// the gate in practice but stays listed for structured inputs.
pub const VMESS_CIPHERS: [&str; 5] = ["auto", "none", "zero", "aes-128-gcm", "chacha20-poly1305"];

/// XTLS flow names, including the deprecated-name redirection.
///
/// `xtls-rprx-direct` is deprecated and rewrites to `xtls-rprx-origin`;
/// anything outside this map is dropped from the node.
pub fn default_xtls_flows() -> HashMap<String, String> {
    [
        ("xtls-rprx-vision", "xtls-rprx-vision"),
        ("xtls-rprx-origin", "xtls-rprx-origin"),
        ("xtls-rprx-origin-udp443", "xtls-rprx-origin-udp443"),
        ("xtls-rprx-direct", "xtls-rprx-origin"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// ============================================================================
// Decoder Configuration
// ============================================================================

/// Immutable configuration threaded through every decode call.
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Cipher allow-list for SS and SSR nodes
    pub supported_ciphers: Vec<String>,

    /// Security allow-list for VMess nodes
    pub vmess_ciphers: Vec<String>,

    /// XTLS flow name map (input name → canonical name)
    pub xtls_flows: HashMap<String, String>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            supported_ciphers: SUPPORTED_CIPHERS.iter().map(|s| s.to_string()).collect(),
            vmess_ciphers: VMESS_CIPHERS.iter().map(|s| s.to_string()).collect(),
            xtls_flows: default_xtls_flows(),
        }
    }
}

impl DecoderConfig {
    /// Whether an SS/SSR cipher passes the allow-list gate.
    pub fn cipher_supported(&self, cipher: &str) -> bool {
        self.supported_ciphers.iter().any(|c| c == cipher)
    }

    /// Whether a VMess security value passes the gate.
    pub fn vmess_cipher_supported(&self, cipher: &str) -> bool {
        self.vmess_ciphers.iter().any(|c| c == cipher)
    }

    /// Maps an XTLS flow name to its canonical form, `None` when unsupported.
    pub fn map_flow(&self, flow: &str) -> Option<&str> {
        self.xtls_flows.get(flow).map(String::as_str)
    }
}

// ============================================================================
// Tests
// ============================================================================
