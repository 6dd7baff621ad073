//! Hysteria2 share-link decoder
//!
//! Decodes `hysteria2://password@host:port?params`. QUIC-based, so TLS is
//! always on and ALPN defaults to h3. Bandwidth hints and obfuscation
//! settings pass through when present.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow, bail};
use tracing::trace;
use url::Url;

use crate::decoder::compat::DecoderConfig;
use crate::naming::placeholder_name;
use crate::node::{Hysteria2Node, ProxyNode};

use super::LinkDecoder;

/// Decoder for Hysteria2 (hysteria2://) links
pub struct Hysteria2Decoder;

impl LinkDecoder for Hysteria2Decoder {
    fn scheme(&self) -> &str {
        "hysteria2"
    }

    fn decode(&self, link: &str, _config: &DecoderConfig) -> Result<ProxyNode> {
        trace!("Decoding Hysteria2 link");
        let url = Url::parse(link).map_err(|e| anyhow!("Failed to parse Hysteria2 link: {}", e))?;

        let password = urlencoding::decode(url.username())
            .map_err(|e| anyhow!("Invalid Hysteria2 password encoding: {}", e))?
            .into_owned();
        if password.is_empty() {
            bail!("Hysteria2 link missing password");
        }

        let server = url
            .host_str()
            .ok_or_else(|| anyhow!("Hysteria2 link missing host"))?
            .trim()
            .to_string();

        let port = url
            .port()
            .ok_or_else(|| anyhow!("Hysteria2 link missing port"))?;
        if port == 0 {
            bail!("Hysteria2 link has port 0");
        }

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        let mut node = Hysteria2Node {
            name: placeholder_name(),
            sni: params
                .get("sni")
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| server.clone()),
            server,
            port,
            password,
            ..Default::default()
        };

        if let Some(alpn) = params.get("alpn").filter(|a| !a.is_empty()) {
            node.alpn = alpn.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Some(insecure) = params.get("insecure") {
            node.skip_cert_verify = Some(insecure == "1");
        }

        if let Some(hop) = params.get("hop") {
            node.hop_interval = hop.parse().context("Invalid Hysteria2 hop interval")?;
        }

        node.obfs = params.get("obfs").cloned();
        node.obfs_password = params.get("obfs-password").cloned();
        node.client_fingerprint = params.get("client-fingerprint").cloned();

        if let Some(down) = params.get("download-bandwidth") {
            node.down = Some(down.parse().context("Invalid Hysteria2 download bandwidth")?);
        }
        if let Some(up) = params.get("upload-bandwidth") {
            node.up = Some(up.parse().context("Invalid Hysteria2 upload bandwidth")?);
        }

        Ok(ProxyNode::Hysteria2(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(link: &str) -> Result<ProxyNode> {
        Hysteria2Decoder.decode(link, &DecoderConfig::default())
    }

    fn expect_hysteria2(link: &str) -> Hysteria2Node {
        match decode(link).unwrap() {
            ProxyNode::Hysteria2(hy2) => hy2,
            other => panic!("Expected Hysteria2 node, got {:?}", other),
        }
    }

    #[test]
    fn test_hysteria2_defaults() {
        let hy2 = expect_hysteria2("hysteria2://secret@example.com:443");
        assert_eq!(hy2.server, "example.com");
        assert_eq!(hy2.port, 443);
        assert_eq!(hy2.password, "secret");
        assert!(hy2.tls);
        assert_eq!(hy2.sni, "example.com");
        assert_eq!(hy2.alpn, vec!["h3".to_string()]);
        assert_eq!(hy2.hop_interval, 10);
        assert!(hy2.skip_cert_verify.is_none());
        assert!(hy2.name.starts_with("Node-"));
    }

    #[test]
    fn test_hysteria2_explicit_params() {
        let hy2 = expect_hysteria2(
            "hysteria2://secret@example.com:443?sni=hy2.example.com&alpn=h3,h2&insecure=1&hop=30",
        );
        assert_eq!(hy2.sni, "hy2.example.com");
        assert_eq!(hy2.alpn, vec!["h3".to_string(), "h2".to_string()]);
        assert_eq!(hy2.skip_cert_verify, Some(true));
        assert_eq!(hy2.hop_interval, 30);
    }

    #[test]
    fn test_hysteria2_insecure_zero_is_explicit_false() {
        let hy2 = expect_hysteria2("hysteria2://secret@example.com:443?insecure=0");
        assert_eq!(hy2.skip_cert_verify, Some(false));
    }

    #[test]
    fn test_hysteria2_obfs_passthrough() {
        let hy2 = expect_hysteria2(
            "hysteria2://secret@example.com:443?obfs=salamander&obfs-password=obfspw",
        );
        assert_eq!(hy2.obfs.as_deref(), Some("salamander"));
        assert_eq!(hy2.obfs_password.as_deref(), Some("obfspw"));
    }

    #[test]
    fn test_hysteria2_bandwidth_hints() {
        let hy2 = expect_hysteria2(
            "hysteria2://secret@example.com:443?download-bandwidth=100&upload-bandwidth=50",
        );
        assert_eq!(hy2.down, Some(100));
        assert_eq!(hy2.up, Some(50));
    }

    #[test]
    fn test_hysteria2_invalid_bandwidth_rejected() {
        assert!(decode("hysteria2://secret@example.com:443?download-bandwidth=fast").is_err());
        assert!(decode("hysteria2://secret@example.com:443?hop=soon").is_err());
    }

    #[test]
    fn test_hysteria2_password_is_urldecoded() {
        let hy2 = expect_hysteria2("hysteria2://p%40ss@example.com:443");
        assert_eq!(hy2.password, "p@ss");
    }

    #[test]
    fn test_hysteria2_missing_required_fields() {
        assert!(decode("hysteria2://@example.com:443").is_err());
        assert!(decode("hysteria2://secret@example.com").is_err());
    }
}
