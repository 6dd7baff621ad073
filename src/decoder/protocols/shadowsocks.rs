//! Shadowsocks share-link decoder
//!
//! Three link encodings coexist in the wild and are tried in order, first
//! success wins:
//! 1. `ss://BASE64(method:password@server:port)` (legacy, whole payload)
//! 2. `ss://method:password@server:port` (plain)
//! 3. `ss://BASE64(method:password)@server:port` (SIP002 userinfo)
//!
//! Query parameters (`plugin`, `plugin-opts`) and the name fragment are
//! stripped before the chain runs.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::trace;

use crate::decoder::compat::DecoderConfig;
use crate::decoder::repair::{decode_base64, decode_base64_utf8};
use crate::naming::placeholder_name;
use crate::node::{ProxyNode, ShadowsocksNode};

use super::LinkDecoder;

/// Decoder for Shadowsocks (ss://) links
pub struct ShadowsocksDecoder;

/// Raw fields pulled out of a link payload before validation.
struct SsCore {
    method: String,
    password: String,
    server: String,
    port: String,
}

/// The ordered decode-strategy chain; evaluation stops at the first success.
const STRATEGIES: [(&str, fn(&str) -> Result<SsCore>); 3] = [
    ("whole-payload base64", decode_whole_base64),
    ("plain text", decode_plain),
    ("base64 userinfo", decode_userinfo_base64),
];

impl LinkDecoder for ShadowsocksDecoder {
    fn scheme(&self) -> &str {
        "ss"
    }

    fn decode(&self, link: &str, config: &DecoderConfig) -> Result<ProxyNode> {
        trace!("Decoding Shadowsocks link");

        let payload = link
            .strip_prefix("ss://")
            .ok_or_else(|| anyhow!("Invalid Shadowsocks link: missing ss:// prefix"))?;

        // Drop the name fragment, keep the query for plugin parameters
        let payload = payload.split('#').next().unwrap_or(payload);
        let (payload, query) = match payload.split_once('?') {
            Some((main, query)) => (main, query),
            None => (payload, ""),
        };
        let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        let mut core = None;
        for (name, attempt) in STRATEGIES {
            match attempt(payload) {
                Ok(parsed) => {
                    trace!("Shadowsocks strategy '{}' succeeded", name);
                    core = Some(parsed);
                    break;
                }
                Err(e) => trace!("Shadowsocks strategy '{}' failed: {:#}", name, e),
            }
        }
        let core = core.ok_or_else(|| anyhow!("All Shadowsocks decode strategies failed"))?;

        if core.method.is_empty()
            || core.password.is_empty()
            || core.server.is_empty()
            || core.port.is_empty()
        {
            bail!("Shadowsocks link missing required fields");
        }

        let cipher = normalize_cipher(&core.method);
        if cipher.is_empty() {
            bail!("Shadowsocks cipher is empty after normalization");
        }

        // 2022-class ciphers carry a fixed-length binary key
        let password = if cipher.starts_with("2022") {
            canonicalize_2022_key(&cipher, &core.password)?
        } else {
            core.password
        };

        if !config.cipher_supported(&cipher) {
            bail!("Shadowsocks cipher '{}' is not supported, node dropped", cipher);
        }

        let port: u16 = clean_port(&core.port)
            .parse()
            .context("Invalid Shadowsocks port")?;
        if port == 0 {
            bail!("Shadowsocks link has port 0");
        }

        Ok(ProxyNode::Shadowsocks(ShadowsocksNode {
            name: placeholder_name(),
            server: core.server.trim().to_string(),
            port,
            cipher,
            password,
            udp: true,
            plugin: params.get("plugin").cloned(),
            plugin_opts: params.get("plugin-opts").cloned(),
        }))
    }
}

// ============================================================================
// Decode Strategies
// ============================================================================

/// Strategy 1: the whole payload is base64 of `method:password@server:port`.
fn decode_whole_base64(payload: &str) -> Result<SsCore> {
    // A length of 1 mod 4 can never be repaired into valid base64
    if payload.len() % 4 == 1 {
        bail!("payload length cannot be repaired to base64");
    }
    let decoded = decode_base64_utf8(payload)?;
    split_core(&decoded)
}

/// Strategy 2: the payload is literally `method:password@server:port`.
fn decode_plain(payload: &str) -> Result<SsCore> {
    split_core(payload)
}

/// Strategy 3: only the userinfo before `@` is base64 of `method:password`.
fn decode_userinfo_base64(payload: &str) -> Result<SsCore> {
    let (userinfo, hostport) = payload
        .split_once('@')
        .ok_or_else(|| anyhow!("missing @ separator"))?;
    let decoded = decode_base64_utf8(userinfo)?;
    let (method, password) = decoded
        .split_once(':')
        .ok_or_else(|| anyhow!("missing method:password separator"))?;
    let (server, port) = hostport
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("missing server:port separator"))?;
    Ok(SsCore {
        method: method.to_string(),
        password: password.to_string(),
        server: server.to_string(),
        port: port.to_string(),
    })
}

/// Splits `method:password@server:port` into its four fields.
fn split_core(text: &str) -> Result<SsCore> {
    let (userinfo, hostport) = text
        .split_once('@')
        .ok_or_else(|| anyhow!("missing @ separator"))?;
    let (method, password) = userinfo
        .split_once(':')
        .ok_or_else(|| anyhow!("missing method:password separator"))?;
    let (server, port) = hostport
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("missing server:port separator"))?;
    Ok(SsCore {
        method: method.to_string(),
        password: password.to_string(),
        server: server.to_string(),
        port: port.to_string(),
    })
}

// ============================================================================
// Field Normalization
// ============================================================================

/// Strips a stray leading `ss` (but not `ssr`) and any leftover hyphen from
/// the method, e.g. `ss-aes-128-gcm` → `aes-128-gcm`.
fn normalize_cipher(method: &str) -> String {
    let cipher = method.to_lowercase();
    if cipher.starts_with("ss") && cipher != "ssr" {
        cipher["ss".len()..].trim_start_matches('-').to_string()
    } else {
        cipher
    }
}

/// Validates a 2022-class key and re-encodes it to canonical base64.
///
/// The password must decode (base64 or hex) into exactly 16 bytes for
/// 128-bit ciphers or 32 bytes for 256-bit ciphers.
fn canonicalize_2022_key(cipher: &str, password: &str) -> Result<String> {
    let key = decode_base64(password)
        .or_else(|_| hex::decode(password).context("password is neither base64 nor hex"))?;
    let expected = if cipher.contains("aes-256") { 32 } else { 16 };
    if key.len() != expected {
        bail!(
            "key length {} for cipher '{}', expected {} bytes",
            key.len(),
            cipher,
            expected
        );
    }
    Ok(STANDARD.encode(key))
}

/// Strips query leftovers and trailing slashes from a port string.
fn clean_port(port: &str) -> &str {
    let port = port.split('?').next().unwrap_or(port);
    port.strip_suffix('/').unwrap_or(port).trim()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(link: &str) -> Result<ProxyNode> {
        ShadowsocksDecoder.decode(link, &DecoderConfig::default())
    }

    fn expect_ss(link: &str) -> ShadowsocksNode {
        match decode(link).unwrap() {
            ProxyNode::Shadowsocks(ss) => ss,
            other => panic!("Expected Shadowsocks node, got {:?}", other),
        }
    }

    #[test]
    fn test_ss_sip002_userinfo_base64() {
        // base64("aes-256-gcm:password")
        let ss = expect_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@203.0.113.5:8388");
        assert_eq!(ss.server, "203.0.113.5");
        assert_eq!(ss.port, 8388);
        assert_eq!(ss.cipher, "aes-256-gcm");
        assert_eq!(ss.password, "password");
        assert!(ss.udp);
    }

    #[test]
    fn test_ss_legacy_whole_base64() {
        // base64("aes-256-gcm:password@203.0.113.5:8388")
        let payload = STANDARD.encode("aes-256-gcm:password@203.0.113.5:8388");
        let ss = expect_ss(&format!("ss://{}", payload));
        assert_eq!(ss.server, "203.0.113.5");
        assert_eq!(ss.port, 8388);
        assert_eq!(ss.cipher, "aes-256-gcm");
        assert_eq!(ss.password, "password");
    }

    #[test]
    fn test_ss_plain_text() {
        let ss = expect_ss("ss://aes-256-gcm:password@203.0.113.5:8388");
        assert_eq!(ss.cipher, "aes-256-gcm");
        assert_eq!(ss.password, "password");
    }

    #[test]
    fn test_ss_all_strategies_agree() {
        let plain = expect_ss("ss://aes-256-gcm:password@203.0.113.5:8388");
        let legacy = expect_ss(&format!(
            "ss://{}",
            STANDARD.encode("aes-256-gcm:password@203.0.113.5:8388")
        ));
        let sip002 = expect_ss(&format!(
            "ss://{}@203.0.113.5:8388",
            STANDARD.encode("aes-256-gcm:password")
        ));

        for node in [&legacy, &sip002] {
            assert_eq!(node.server, plain.server);
            assert_eq!(node.port, plain.port);
            assert_eq!(node.cipher, plain.cipher);
            assert_eq!(node.password, plain.password);
        }
    }

    #[test]
    fn test_ss_fragment_and_query_are_stripped() {
        let ss = expect_ss("ss://aes-256-gcm:password@203.0.113.5:8388?plugin=obfs-local#My%20Node");
        assert_eq!(ss.server, "203.0.113.5");
        assert_eq!(ss.plugin.as_deref(), Some("obfs-local"));
        // The fragment never becomes the name; a synthetic one is assigned
        assert!(ss.name.starts_with("Node-"));
    }

    #[test]
    fn test_ss_prefix_is_stripped_from_cipher() {
        assert_eq!(normalize_cipher("ss-aes-128-gcm"), "aes-128-gcm");
        assert_eq!(normalize_cipher("ssaes-128-gcm"), "aes-128-gcm");
        assert_eq!(normalize_cipher("AES-256-GCM"), "aes-256-gcm");
        assert_eq!(normalize_cipher("ssr"), "ssr");
    }

    #[test]
    fn test_ss_unsupported_cipher_rejected() {
        assert!(decode("ss://aes-192-gcm:password@203.0.113.5:8388").is_err());
    }

    #[test]
    fn test_ss_2022_key_reencoded_to_canonical_base64() {
        // Unpadded key is repaired and re-encoded with padding
        let canonical = STANDARD.encode([0x42u8; 16]);
        let stripped = canonical.trim_end_matches('=');
        let link = format!(
            "ss://2022-blake3-aes-128-gcm:{}@203.0.113.5:8388",
            stripped
        );
        let ss = expect_ss(&link);
        assert_eq!(ss.password, canonical);
    }

    #[test]
    fn test_ss_2022_wrong_key_length_rejected() {
        // 16-byte key for a 256-bit cipher
        let key = STANDARD.encode([0u8; 16]);
        let link = format!("ss://2022-blake3-aes-256-gcm:{}@203.0.113.5:8388", key);
        assert!(decode(&link).is_err());
    }

    #[test]
    fn test_ss_port_cleaning() {
        assert_eq!(clean_port("8388/"), "8388");
        assert_eq!(clean_port("8388?x=1"), "8388");
        assert_eq!(clean_port(" 8388 "), "8388");
    }

    #[test]
    fn test_ss_port_out_of_bounds() {
        assert!(decode("ss://aes-256-gcm:password@203.0.113.5:0").is_err());
        assert!(decode("ss://aes-256-gcm:password@203.0.113.5:65536").is_err());
    }

    #[test]
    fn test_ss_garbage_payload() {
        assert!(decode("ss://%%%").is_err());
        assert!(decode("ss://").is_err());
    }
}
