//! Transport-options builder
//!
//! Share links describe transports two ways: URI query parameters
//! (VLESS/Trojan) and fields inside the VMess JSON blob. The [`ParamSource`]
//! trait papers over the difference so one builder can apply the
//! network-specific shape rules for all decoders:
//!
//! - `ws`: path defaults to `/`, `Host` plus `header-*` extras
//! - `grpc`: omitted entirely when the service name is blank, forces TLS
//! - `http`: `path` and `Host` wrapped in single-element arrays
//! - `h2`: forces TLS regardless of the link's own TLS flag
//! - `quic`: `security`/`key`/`type` passthrough
//!
//! An option record with nothing in it is never attached to a node.

use std::collections::HashMap;

use crate::node::{
    GrpcOptions, H2Options, HttpHeaders, HttpOptions, QuicOptions, TransportKind, WsOptions,
};

// ============================================================================
// Parameter Source
// ============================================================================

/// Generic key/value lookup over a URI query or a JSON record.
pub trait ParamSource {
    /// Returns the parameter value for `key`, if present.
    fn get(&self, key: &str) -> Option<&str>;

    /// Extra WebSocket headers from `header-*` parameters, name prefix
    /// already stripped. JSON sources have none.
    fn extra_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Query-parameter map collected from a parsed URI.
pub struct QueryParams(pub HashMap<String, String>);

impl ParamSource for QueryParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn extra_headers(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .filter(|(k, _)| k.to_lowercase().starts_with("header-"))
            .map(|(k, v)| (k["header-".len()..].to_string(), v.clone()))
            .collect()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Result of a transport build: at most one options record is populated.
#[derive(Debug, Default)]
pub struct TransportBuild {
    pub ws_opts: Option<WsOptions>,
    pub grpc_opts: Option<GrpcOptions>,
    pub http_opts: Option<HttpOptions>,
    pub h2_opts: Option<H2Options>,
    pub quic_opts: Option<QuicOptions>,

    /// The network requires TLS on, whatever the link claimed
    pub force_tls: bool,
}

/// Builds the transport-specific options record for `network`.
pub fn build_transport(network: TransportKind, params: &dyn ParamSource) -> TransportBuild {
    let mut build = TransportBuild {
        force_tls: network.forces_tls(),
        ..Default::default()
    };

    match network {
        TransportKind::Tcp => {}
        TransportKind::Ws => {
            let mut headers = HashMap::new();
            if let Some(host) = params.get("host")
                && !host.is_empty()
            {
                headers.insert("Host".to_string(), host.to_string());
            }
            for (name, value) in params.extra_headers() {
                headers.insert(name, value);
            }
            build.ws_opts = Some(WsOptions {
                path: params.get("path").unwrap_or("/").to_string(),
                headers,
            });
        }
        TransportKind::Grpc => {
            if let Some(service_name) = params.get("serviceName")
                && !service_name.is_empty()
            {
                build.grpc_opts = Some(GrpcOptions {
                    grpc_service_name: service_name.to_string(),
                });
            }
        }
        TransportKind::Http => {
            let path: Vec<String> = params
                .get("path")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(|p| vec![p.to_string()])
                .unwrap_or_default();
            let headers = params
                .get("host")
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(|h| HttpHeaders {
                    host: vec![h.to_string()],
                });
            if !path.is_empty() || headers.is_some() {
                build.http_opts = Some(HttpOptions { path, headers });
            }
        }
        TransportKind::H2 => {
            let path = params
                .get("path")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string);
            let host: Vec<String> = params
                .get("host")
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(|h| vec![h.to_string()])
                .unwrap_or_default();
            if path.is_some() || !host.is_empty() {
                build.h2_opts = Some(H2Options { path, host });
            }
        }
        TransportKind::Quic => {
            let security = params.get("quicSecurity").map(str::to_string);
            let key = params.get("key").map(str::to_string);
            let header_type = params.get("type").map(str::to_string);
            if security.is_some() || key.is_some() || header_type.is_some() {
                build.quic_opts = Some(QuicOptions {
                    security,
                    key,
                    header_type,
                });
            }
        }
    }

    build
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_ws_path_defaults_to_slash() {
        let build = build_transport(TransportKind::Ws, &params(&[]));
        let ws = build.ws_opts.unwrap();
        assert_eq!(ws.path, "/");
        assert!(ws.headers.is_empty());
        assert!(!build.force_tls);
    }

    #[test]
    fn test_ws_collects_host_and_header_extras() {
        let build = build_transport(
            TransportKind::Ws,
            &params(&[
                ("path", "/tunnel"),
                ("host", "cdn.example.com"),
                ("header-User-Agent", "curl/8"),
            ]),
        );
        let ws = build.ws_opts.unwrap();
        assert_eq!(ws.path, "/tunnel");
        assert_eq!(ws.headers.get("Host").unwrap(), "cdn.example.com");
        assert_eq!(ws.headers.get("User-Agent").unwrap(), "curl/8");
    }

    #[test]
    fn test_grpc_omitted_when_service_name_blank() {
        let build = build_transport(TransportKind::Grpc, &params(&[("serviceName", "")]));
        assert!(build.grpc_opts.is_none());
        assert!(build.force_tls);

        let build = build_transport(TransportKind::Grpc, &params(&[("serviceName", "svc")]));
        assert_eq!(build.grpc_opts.unwrap().grpc_service_name, "svc");
    }

    #[test]
    fn test_http_wraps_path_and_host_in_arrays() {
        let build = build_transport(
            TransportKind::Http,
            &params(&[("path", "/get"), ("host", "example.com")]),
        );
        let http = build.http_opts.unwrap();
        assert_eq!(http.path, vec!["/get"]);
        assert_eq!(http.headers.unwrap().host, vec!["example.com"]);
    }

    #[test]
    fn test_http_omitted_when_both_blank() {
        let build = build_transport(
            TransportKind::Http,
            &params(&[("path", "  "), ("host", "")]),
        );
        assert!(build.http_opts.is_none());
    }

    #[test]
    fn test_h2_forces_tls_even_without_opts() {
        let build = build_transport(TransportKind::H2, &params(&[]));
        assert!(build.force_tls);
        assert!(build.h2_opts.is_none());

        let build = build_transport(
            TransportKind::H2,
            &params(&[("path", "/h2"), ("host", "example.com")]),
        );
        let h2 = build.h2_opts.unwrap();
        assert_eq!(h2.path.as_deref(), Some("/h2"));
        assert_eq!(h2.host, vec!["example.com"]);
    }

    #[test]
    fn test_quic_reads_its_three_params() {
        let build = build_transport(
            TransportKind::Quic,
            &params(&[
                ("quicSecurity", "aes-128-gcm"),
                ("key", "k"),
                ("type", "quic"),
            ]),
        );
        let quic = build.quic_opts.unwrap();
        assert_eq!(quic.security.as_deref(), Some("aes-128-gcm"));
        assert_eq!(quic.key.as_deref(), Some("k"));
        assert_eq!(quic.header_type.as_deref(), Some("quic"));
    }

    #[test]
    fn test_tcp_builds_nothing() {
        let build = build_transport(TransportKind::Tcp, &params(&[("path", "/x")]));
        assert!(build.ws_opts.is_none());
        assert!(build.http_opts.is_none());
        assert!(!build.force_tls);
    }
}
