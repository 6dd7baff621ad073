//! Normalized proxy node model
//!
//! This module defines the Clash-compatible node records produced by the
//! decoders. The field names are a de facto interchange format consumed by
//! proxy-client configuration loaders, so every serialized key (including
//! hyphenated ones like `ws-opts` and `skip-cert-verify`) must be reproduced
//! exactly.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Transport Kind
// ============================================================================

/// Transport carried by a node, `tcp` when the link does not say otherwise.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Tcp,
    Ws,
    Grpc,
    Http,
    H2,
    Quic,
}

impl TransportKind {
    /// Maps a transport name from a link (`type` query param or `net` field).
    ///
    /// Accepts the `websocket` spelling some generators emit for `ws`.
    pub fn from_input(value: &str) -> Option<Self> {
        match value {
            "tcp" => Some(Self::Tcp),
            "ws" | "websocket" => Some(Self::Ws),
            "grpc" => Some(Self::Grpc),
            "http" => Some(Self::Http),
            "h2" => Some(Self::H2),
            "quic" => Some(Self::Quic),
            _ => None,
        }
    }

    /// Whether this transport requires TLS regardless of what the link says.
    pub fn forces_tls(self) -> bool {
        matches!(self, Self::H2 | Self::Grpc)
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, Self::Tcp)
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tcp => "tcp",
            Self::Ws => "ws",
            Self::Grpc => "grpc",
            Self::Http => "http",
            Self::H2 => "h2",
            Self::Quic => "quic",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Transport Option Records
// ============================================================================

/// WebSocket options (`ws-opts`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct WsOptions {
    /// Request path, `/` when the link does not carry one
    #[serde(default = "default_ws_path")]
    pub path: String,

    /// Request headers (`Host` plus any `header-*` extras from the link)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

/// gRPC options (`grpc-opts`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct GrpcOptions {
    #[serde(rename = "grpc-service-name")]
    pub grpc_service_name: String,
}

/// HTTP options (`http-opts`)
///
/// Both `path` and the `Host` header are single-element arrays; downstream
/// consumers require that shape.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HttpOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HttpHeaders>,
}

/// HTTP header block carrying the array-wrapped `Host`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HttpHeaders {
    #[serde(rename = "Host")]
    pub host: Vec<String>,
}

/// HTTP/2 options (`h2-opts`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct H2Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
}

/// QUIC options (`quic-opts`)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct QuicOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// QUIC header type, sourced from the link's `type` parameter
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub header_type: Option<String>,
}

/// REALITY options (`reality-opts`)
///
/// Present only when both fields validated; a half-populated block is never
/// emitted.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RealityOptions {
    #[serde(rename = "public-key", default)]
    pub public_key: String,

    #[serde(rename = "short-id", default)]
    pub short_id: String,
}

// ============================================================================
// Proxy Node Enum
// ============================================================================

/// A normalized proxy node in the Clash interchange schema.
///
/// Tagged by the `type` key, one variant per supported protocol. A node is
/// built once inside a decode call and never mutated afterwards; renaming
/// goes through [`ProxyNode::with_name`], which produces a new record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProxyNode {
    #[serde(rename = "vmess")]
    VMess(VMessNode),
    #[serde(rename = "vless")]
    VLess(VLessNode),
    #[serde(rename = "ss")]
    Shadowsocks(ShadowsocksNode),
    #[serde(rename = "ssr")]
    ShadowsocksR(ShadowsocksRNode),
    Trojan(TrojanNode),
    Hysteria2(Hysteria2Node),
}

impl ProxyNode {
    /// Protocol name as it appears in the `type` field.
    pub fn proto(&self) -> &'static str {
        match self {
            ProxyNode::VMess(_) => "vmess",
            ProxyNode::VLess(_) => "vless",
            ProxyNode::Shadowsocks(_) => "ss",
            ProxyNode::ShadowsocksR(_) => "ssr",
            ProxyNode::Trojan(_) => "trojan",
            ProxyNode::Hysteria2(_) => "hysteria2",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProxyNode::VMess(n) => &n.name,
            ProxyNode::VLess(n) => &n.name,
            ProxyNode::Shadowsocks(n) => &n.name,
            ProxyNode::ShadowsocksR(n) => &n.name,
            ProxyNode::Trojan(n) => &n.name,
            ProxyNode::Hysteria2(n) => &n.name,
        }
    }

    pub fn server(&self) -> &str {
        match self {
            ProxyNode::VMess(n) => &n.server,
            ProxyNode::VLess(n) => &n.server,
            ProxyNode::Shadowsocks(n) => &n.server,
            ProxyNode::ShadowsocksR(n) => &n.server,
            ProxyNode::Trojan(n) => &n.server,
            ProxyNode::Hysteria2(n) => &n.server,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            ProxyNode::VMess(n) => n.port,
            ProxyNode::VLess(n) => n.port,
            ProxyNode::Shadowsocks(n) => n.port,
            ProxyNode::ShadowsocksR(n) => n.port,
            ProxyNode::Trojan(n) => n.port,
            ProxyNode::Hysteria2(n) => n.port,
        }
    }

    /// Returns a copy of this node carrying a new display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self {
            ProxyNode::VMess(n) => n.name = name,
            ProxyNode::VLess(n) => n.name = name,
            ProxyNode::Shadowsocks(n) => n.name = name,
            ProxyNode::ShadowsocksR(n) => n.name = name,
            ProxyNode::Trojan(n) => n.name = name,
            ProxyNode::Hysteria2(n) => n.name = name,
        }
        self
    }
}

// ============================================================================
// Per-Protocol Records
// ============================================================================

/// VMess node
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VMessNode {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub server: String,

    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: u16,

    #[serde(default)]
    pub uuid: String,

    #[serde(rename = "alterId", default)]
    pub alter_id: u32,

    #[serde(default)]
    pub cipher: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,

    #[serde(
        rename = "skip-cert-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_cert_verify: Option<bool>,

    #[serde(default, skip_serializing_if = "TransportKind::is_tcp")]
    pub network: TransportKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,

    #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,

    #[serde(rename = "http-opts", default, skip_serializing_if = "Option::is_none")]
    pub http_opts: Option<HttpOptions>,

    #[serde(rename = "h2-opts", default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Options>,

    #[serde(rename = "quic-opts", default, skip_serializing_if = "Option::is_none")]
    pub quic_opts: Option<QuicOptions>,

    #[serde(
        rename = "reality-opts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reality_opts: Option<RealityOptions>,

    #[serde(
        rename = "client-fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_fingerprint: Option<String>,
}

/// VLESS node
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct VLessNode {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub server: String,

    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: u16,

    #[serde(default)]
    pub uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,

    #[serde(
        rename = "skip-cert-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_cert_verify: Option<bool>,

    #[serde(default, skip_serializing_if = "TransportKind::is_tcp")]
    pub network: TransportKind,

    /// XTLS flow name, already mapped through the compatibility table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    /// Structured inputs may spell this `servername`
    #[serde(alias = "servername", default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,

    #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,

    #[serde(rename = "http-opts", default, skip_serializing_if = "Option::is_none")]
    pub http_opts: Option<HttpOptions>,

    #[serde(rename = "h2-opts", default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Options>,

    #[serde(rename = "quic-opts", default, skip_serializing_if = "Option::is_none")]
    pub quic_opts: Option<QuicOptions>,

    #[serde(
        rename = "reality-opts",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reality_opts: Option<RealityOptions>,

    #[serde(
        rename = "client-fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_fingerprint: Option<String>,
}

/// Shadowsocks node
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksNode {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub server: String,

    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: u16,

    #[serde(default)]
    pub cipher: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_true")]
    pub udp: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,

    #[serde(rename = "plugin-opts", default, skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<String>,
}

/// ShadowsocksR node
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ShadowsocksRNode {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub server: String,

    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: u16,

    #[serde(default)]
    pub cipher: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub protocol: String,

    #[serde(default)]
    pub obfs: String,

    #[serde(default = "default_true")]
    pub udp: bool,

    #[serde(rename = "obfs-param", default, skip_serializing_if = "Option::is_none")]
    pub obfs_param: Option<String>,

    #[serde(
        rename = "protocol-param",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub protocol_param: Option<String>,
}

/// Trojan node
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TrojanNode {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub server: String,

    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: u16,

    #[serde(default)]
    pub password: String,

    /// Trojan always runs over TLS
    #[serde(default = "default_true")]
    pub tls: bool,

    /// Falls back to the server hostname when the link omits it
    #[serde(default)]
    pub sni: String,

    #[serde(
        rename = "skip-cert-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_cert_verify: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,

    #[serde(default, skip_serializing_if = "TransportKind::is_tcp")]
    pub network: TransportKind,

    #[serde(rename = "ws-opts", default, skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOptions>,

    #[serde(rename = "grpc-opts", default, skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOptions>,

    #[serde(rename = "http-opts", default, skip_serializing_if = "Option::is_none")]
    pub http_opts: Option<HttpOptions>,

    #[serde(rename = "h2-opts", default, skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Options>,

    #[serde(
        rename = "client-fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_fingerprint: Option<String>,
}

/// Hysteria2 node
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Hysteria2Node {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub server: String,

    #[serde(default, deserialize_with = "port_from_string_or_number")]
    pub port: u16,

    #[serde(default)]
    pub password: String,

    /// Hysteria2 always runs over TLS
    #[serde(default = "default_true")]
    pub tls: bool,

    #[serde(default)]
    pub sni: String,

    #[serde(default = "default_h3_alpn")]
    pub alpn: Vec<String>,

    #[serde(
        rename = "skip-cert-verify",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub skip_cert_verify: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,

    #[serde(
        rename = "obfs-password",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub obfs_password: Option<String>,

    /// Port-hopping interval in seconds, 10 when the link omits `hop`
    #[serde(rename = "hop-interval", default = "default_hop_interval")]
    pub hop_interval: u32,

    /// Download bandwidth in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down: Option<u64>,

    /// Upload bandwidth in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up: Option<u64>,

    #[serde(
        rename = "client-fingerprint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_fingerprint: Option<String>,
}

impl Default for Hysteria2Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            server: String::new(),
            port: 0,
            password: String::new(),
            tls: true,
            sni: String::new(),
            alpn: default_h3_alpn(),
            skip_cert_verify: None,
            obfs: None,
            obfs_password: None,
            hop_interval: default_hop_interval(),
            down: None,
            up: None,
            client_fingerprint: None,
        }
    }
}

// ============================================================================
// Serde Helpers
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/".to_string()
}

fn default_hop_interval() -> u32 {
    10
}

fn default_h3_alpn() -> Vec<String> {
    vec!["h3".to_string()]
}

/// Custom deserializer for port (handles both string and number)
pub(crate) fn port_from_string_or_number<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u16),
        String(String),
    }

    match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => Ok(n),
        PortValue::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_keys_match_interchange_format() {
        let node = ProxyNode::VLess(VLessNode {
            name: "n".to_string(),
            server: "example.com".to_string(),
            port: 443,
            uuid: "uuid".to_string(),
            tls: Some(true),
            skip_cert_verify: Some(false),
            network: TransportKind::Ws,
            ws_opts: Some(WsOptions {
                path: "/ws".to_string(),
                headers: HashMap::new(),
            }),
            reality_opts: Some(RealityOptions {
                public_key: "pk".to_string(),
                short_id: "aa".to_string(),
            }),
            client_fingerprint: Some("chrome".to_string()),
            ..Default::default()
        });

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "vless");
        assert_eq!(json["skip-cert-verify"], false);
        assert_eq!(json["network"], "ws");
        assert_eq!(json["ws-opts"]["path"], "/ws");
        assert_eq!(json["reality-opts"]["public-key"], "pk");
        assert_eq!(json["reality-opts"]["short-id"], "aa");
        assert_eq!(json["client-fingerprint"], "chrome");
    }

    #[test]
    fn test_tcp_network_is_omitted() {
        let node = ProxyNode::Trojan(TrojanNode {
            name: "n".to_string(),
            server: "example.com".to_string(),
            port: 443,
            password: "secret".to_string(),
            tls: true,
            sni: "example.com".to_string(),
            ..Default::default()
        });

        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("network").is_none());
        assert_eq!(json["tls"], true);
    }

    #[test]
    fn test_http_opts_array_shape() {
        let opts = HttpOptions {
            path: vec!["/".to_string()],
            headers: Some(HttpHeaders {
                host: vec!["example.com".to_string()],
            }),
        };
        let json = serde_json::to_value(&opts).unwrap();
        assert!(json["path"].is_array());
        assert!(json["headers"]["Host"].is_array());
    }

    #[test]
    fn test_alter_id_key_is_camel_case() {
        let node = ProxyNode::VMess(VMessNode {
            name: "n".to_string(),
            server: "s".to_string(),
            port: 1,
            uuid: "u".to_string(),
            alter_id: 4,
            cipher: "auto".to_string(),
            ..Default::default()
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["alterId"], 4);
    }

    #[test]
    fn test_port_deserializes_from_string_or_number() {
        let from_number: VMessNode = serde_json::from_str(r#"{"port": 443}"#).unwrap();
        assert_eq!(from_number.port, 443);

        let from_string: VMessNode = serde_json::from_str(r#"{"port": "443"}"#).unwrap();
        assert_eq!(from_string.port, 443);

        let too_big = serde_json::from_str::<VMessNode>(r#"{"port": "70000"}"#);
        assert!(too_big.is_err());
    }

    #[test]
    fn test_with_name_produces_new_record() {
        let node = ProxyNode::Shadowsocks(ShadowsocksNode {
            name: "old".to_string(),
            server: "s".to_string(),
            port: 1,
            cipher: "aes-256-gcm".to_string(),
            password: "p".to_string(),
            udp: true,
            ..Default::default()
        });

        let renamed = node.clone().with_name("new");
        assert_eq!(renamed.name(), "new");
        assert_eq!(node.name(), "old");
        assert_eq!(renamed.server(), node.server());
    }

    #[test]
    fn test_hysteria2_defaults() {
        let node: Hysteria2Node = serde_yaml::from_str("server: example.com\nport: 443").unwrap();
        assert!(node.tls);
        assert_eq!(node.alpn, vec!["h3"]);
        assert_eq!(node.hop_interval, 10);
    }

    #[test]
    fn test_structured_node_roundtrip() {
        let yaml = r#"
type: ss
name: node-1
server: 203.0.113.5
port: 8388
cipher: aes-256-gcm
password: password
udp: true
"#;
        let node: ProxyNode = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(node.proto(), "ss");
        assert_eq!(node.server(), "203.0.113.5");
        assert_eq!(node.port(), 8388);
    }
}
