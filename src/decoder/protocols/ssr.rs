//! ShadowsocksR share-link decoder
//!
//! The whole body after `ssr://` is base64. The decoded shape is positional:
//! `server:port:protocol:method:obfs:base64(password)[/?params]`, with the
//! optional trailing parameters themselves base64-encoded.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use tracing::trace;

use crate::decoder::compat::DecoderConfig;
use crate::decoder::repair::decode_base64_utf8;
use crate::naming::placeholder_name;
use crate::node::{ProxyNode, ShadowsocksRNode};

use super::LinkDecoder;

/// Decoder for ShadowsocksR (ssr://) links
pub struct SsrDecoder;

impl LinkDecoder for SsrDecoder {
    fn scheme(&self) -> &str {
        "ssr"
    }

    fn decode(&self, link: &str, config: &DecoderConfig) -> Result<ProxyNode> {
        trace!("Decoding SSR link");

        let body = link
            .strip_prefix("ssr://")
            .ok_or_else(|| anyhow!("Invalid SSR link: missing ssr:// prefix"))?;

        let decoded = decode_base64_utf8(body).context("Failed to decode SSR link body")?;
        if decoded.is_empty() {
            bail!("SSR link body is empty");
        }

        let (main_part, params_str) = match decoded.split_once('?') {
            Some((main, params)) => (main, params),
            None => (decoded.as_str(), ""),
        };

        let fields: Vec<&str> = main_part.splitn(6, ':').collect();
        if fields.len() < 6 {
            bail!("Invalid SSR link format: expected at least 6 colon-separated fields");
        }
        let (server, port_str, protocol, method, obfs) =
            (fields[0], fields[1], fields[2], fields[3], fields[4]);

        // The password segment may drag a "/?" leftover along
        let password_b64 = fields[5].split('/').next().unwrap_or(fields[5]);
        let password =
            decode_base64_utf8(password_b64).context("Failed to decode SSR password")?;

        let params = decode_params(params_str);

        let cipher = method.to_lowercase();
        if !config.cipher_supported(&cipher) {
            bail!("SSR cipher '{}' is not supported, node dropped", cipher);
        }

        let port: u16 = port_str.parse().context("Invalid SSR port")?;
        if port == 0 {
            bail!("SSR link has port 0");
        }

        Ok(ProxyNode::ShadowsocksR(ShadowsocksRNode {
            name: placeholder_name(),
            server: server.trim().to_string(),
            port,
            cipher,
            password,
            protocol: protocol.to_lowercase(),
            obfs: obfs.to_lowercase(),
            udp: true,
            obfs_param: params.get("obfsparam").cloned(),
            protocol_param: params.get("protoparam").cloned(),
        }))
    }
}

/// Decodes trailing `key=base64(value)` parameters, keeping the raw value
/// when it is not actually base64.
fn decode_params(params_str: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in params_str.split('&').filter(|p| !p.is_empty()) {
        if let Some((key, value)) = pair.split_once('=') {
            let decoded = decode_base64_utf8(value).unwrap_or_else(|_| value.to_string());
            params.insert(key.to_string(), decoded);
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    fn encode_link(body: &str) -> String {
        format!("ssr://{}", STANDARD.encode(body))
    }

    fn decode(link: &str) -> Result<ProxyNode> {
        SsrDecoder.decode(link, &DecoderConfig::default())
    }

    #[test]
    fn test_ssr_basic() {
        let body = format!(
            "203.0.113.9:8388:origin:rc4-md5:plain:{}",
            URL_SAFE_NO_PAD.encode("password")
        );
        let node = decode(&encode_link(&body)).unwrap();

        if let ProxyNode::ShadowsocksR(ssr) = node {
            assert_eq!(ssr.server, "203.0.113.9");
            assert_eq!(ssr.port, 8388);
            assert_eq!(ssr.protocol, "origin");
            assert_eq!(ssr.cipher, "rc4-md5");
            assert_eq!(ssr.obfs, "plain");
            assert_eq!(ssr.password, "password");
            assert!(ssr.udp);
            assert!(ssr.name.starts_with("Node-"));
        } else {
            panic!("Expected ShadowsocksR node");
        }
    }

    #[test]
    fn test_ssr_with_params() {
        let body = format!(
            "203.0.113.9:8388:auth_aes128_md5:aes-256-cfb:tls1.2_ticket_auth:{}/?obfsparam={}&protoparam={}",
            URL_SAFE_NO_PAD.encode("password"),
            URL_SAFE_NO_PAD.encode("download.windowsupdate.com"),
            URL_SAFE_NO_PAD.encode("1234:abcd")
        );
        let node = decode(&encode_link(&body)).unwrap();

        if let ProxyNode::ShadowsocksR(ssr) = node {
            assert_eq!(ssr.protocol, "auth_aes128_md5");
            assert_eq!(ssr.obfs, "tls1.2_ticket_auth");
            assert_eq!(
                ssr.obfs_param.as_deref(),
                Some("download.windowsupdate.com")
            );
            assert_eq!(ssr.protocol_param.as_deref(), Some("1234:abcd"));
        } else {
            panic!("Expected ShadowsocksR node");
        }
    }

    #[test]
    fn test_ssr_method_is_lowercased() {
        let body = format!(
            "203.0.113.9:8388:ORIGIN:AES-256-CFB:PLAIN:{}",
            URL_SAFE_NO_PAD.encode("pw")
        );
        let node = decode(&encode_link(&body)).unwrap();

        if let ProxyNode::ShadowsocksR(ssr) = node {
            assert_eq!(ssr.cipher, "aes-256-cfb");
            assert_eq!(ssr.protocol, "origin");
            assert_eq!(ssr.obfs, "plain");
        } else {
            panic!("Expected ShadowsocksR node");
        }
    }

    #[test]
    fn test_ssr_unsupported_cipher_rejected() {
        let body = format!(
            "203.0.113.9:8388:origin:table:plain:{}",
            URL_SAFE_NO_PAD.encode("pw")
        );
        assert!(decode(&encode_link(&body)).is_err());
    }

    #[test]
    fn test_ssr_too_few_fields() {
        assert!(decode(&encode_link("203.0.113.9:8388:origin")).is_err());
    }

    #[test]
    fn test_ssr_invalid_base64_body() {
        assert!(decode("ssr://@@@").is_err());
    }

    #[test]
    fn test_ssr_port_out_of_bounds() {
        let body = format!(
            "203.0.113.9:0:origin:rc4-md5:plain:{}",
            URL_SAFE_NO_PAD.encode("pw")
        );
        assert!(decode(&encode_link(&body)).is_err());
    }
}
