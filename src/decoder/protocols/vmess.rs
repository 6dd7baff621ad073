//! VMess share-link decoder
//!
//! VMess links are base64-encoded JSON:
//! `vmess://BASE64({ "add": "host", "port": 443, "id": "uuid", ... })`
//!
//! Transport options are read from JSON fields rather than query parameters,
//! so the shared builder is fed through a [`ParamSource`] wrapper over the
//! decoded record.

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::decoder::compat::DecoderConfig;
use crate::decoder::repair::{decode_base64_utf8, validate_reality};
use crate::decoder::transport::{ParamSource, build_transport};
use crate::naming::placeholder_name;
use crate::node::{ProxyNode, TransportKind, VMessNode, port_from_string_or_number};

use super::LinkDecoder;

/// Decoder for VMess (vmess://) links
pub struct VMessDecoder;

/// VMess link JSON structure
#[derive(Deserialize, Debug)]
struct VMessJson {
    /// Server address
    #[serde(default)]
    add: String,
    /// Server port (can be string or number)
    #[serde(deserialize_with = "port_from_string_or_number")]
    port: u16,
    /// UUID
    #[serde(default)]
    id: String,
    /// Alter ID (can be string or number)
    #[serde(default, deserialize_with = "deserialize_option_u32")]
    aid: Option<u32>,
    /// Encryption method; both `security` and the short `scy` spelling occur
    #[serde(default, alias = "scy")]
    security: Option<String>,
    /// Network type (tcp, ws, etc.)
    #[serde(default)]
    net: Option<String>,
    /// TLS setting, the literal string "tls" when enabled
    #[serde(default)]
    tls: Option<String>,
    #[serde(default)]
    sni: Option<String>,
    #[serde(default)]
    udp: Option<bool>,
    #[serde(rename = "skip-cert-verify", default)]
    skip_cert_verify: Option<bool>,
    /// WebSocket/HTTP host
    #[serde(default)]
    host: Option<String>,
    /// WebSocket/HTTP path
    #[serde(default)]
    path: Option<String>,
    /// gRPC service name
    #[serde(default, rename = "serviceName")]
    service_name: Option<String>,
    /// QUIC security
    #[serde(default, rename = "quicSecurity")]
    quic_security: Option<String>,
    /// QUIC key
    #[serde(default)]
    key: Option<String>,
    /// Header type (for various transports)
    #[serde(default, rename = "type")]
    header_type: Option<String>,
    /// REALITY public key, rarely present for VMess
    #[serde(default)]
    pbk: Option<String>,
    /// REALITY short id
    #[serde(default)]
    sid: Option<String>,
    /// TLS fingerprint
    #[serde(default)]
    fp: Option<String>,
}

/// Feeds the transport builder from JSON fields instead of query parameters.
struct JsonParams<'a>(&'a VMessJson);

impl ParamSource for JsonParams<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "path" => &self.0.path,
            "host" => &self.0.host,
            "serviceName" => &self.0.service_name,
            "quicSecurity" => &self.0.quic_security,
            "key" => &self.0.key,
            "type" => &self.0.header_type,
            _ => &None,
        };
        value.as_deref()
    }
}

impl LinkDecoder for VMessDecoder {
    fn scheme(&self) -> &str {
        "vmess"
    }

    fn decode(&self, link: &str, config: &DecoderConfig) -> Result<ProxyNode> {
        trace!("Decoding VMess link");

        let encoded = link
            .strip_prefix("vmess://")
            .ok_or_else(|| anyhow!("Invalid VMess link: missing vmess:// prefix"))?;

        let decoded = decode_base64_utf8(encoded).context("Failed to decode VMess link")?;
        let json: VMessJson =
            serde_json::from_str(&decoded).context("Failed to parse VMess JSON")?;

        let server = json.add.trim().to_string();
        if server.is_empty() {
            bail!("VMess link missing server address");
        }
        if json.port == 0 {
            bail!("VMess link has port 0");
        }
        if json.id.is_empty() {
            bail!("VMess link missing UUID");
        }

        // Default cipher is auto; an explicit none is normalized to auto
        let mut cipher = json
            .security
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "auto".to_string());
        if cipher == "none" {
            cipher = "auto".to_string();
        }
        if !config.vmess_cipher_supported(&cipher) {
            bail!("VMess cipher '{}' is not supported, node dropped", cipher);
        }

        let network = match json.net.as_deref() {
            None | Some("") => TransportKind::Tcp,
            Some(net) => match TransportKind::from_input(net) {
                Some(kind) => kind,
                None => {
                    warn!("Unrecognized VMess transport '{}', falling back to tcp", net);
                    TransportKind::Tcp
                }
            },
        };

        let mut node = VMessNode {
            name: placeholder_name(),
            server,
            port: json.port,
            uuid: json.id.clone(),
            alter_id: json.aid.unwrap_or(0),
            cipher,
            tls: json.tls.as_ref().map(|t| t == "tls"),
            udp: json.udp,
            skip_cert_verify: json.skip_cert_verify,
            network,
            sni: json.sni.clone(),
            ..Default::default()
        };

        let build = build_transport(network, &JsonParams(&json));
        node.ws_opts = build.ws_opts;
        node.grpc_opts = build.grpc_opts;
        node.http_opts = build.http_opts;
        node.h2_opts = build.h2_opts;
        node.quic_opts = build.quic_opts;
        if build.force_tls {
            node.tls = Some(true);
        }

        // REALITY is attached only when explicitly present and valid,
        // never invented for VMess
        if json.pbk.is_some() || json.sid.is_some() {
            let pbk = json.pbk.as_deref().unwrap_or("");
            let sid = json.sid.as_deref().unwrap_or("");
            match validate_reality(pbk, sid) {
                Ok(opts) => {
                    node.reality_opts = Some(opts);
                    node.client_fingerprint = json.fp.clone();
                }
                Err(e) => debug!("Invalid REALITY params in VMess link, dropped: {:#}", e),
            }
        }

        Ok(ProxyNode::VMess(node))
    }
}

/// Custom deserializer for optional u32 (handles both string and number)
fn deserialize_option_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum U32Value {
        Number(u32),
        String(String),
        Null,
    }

    match Option::<U32Value>::deserialize(deserializer)? {
        Some(U32Value::Number(n)) => Ok(Some(n)),
        Some(U32Value::String(s)) if s.is_empty() => Ok(None),
        Some(U32Value::String(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
        Some(U32Value::Null) | None => Ok(None),
    }
}
