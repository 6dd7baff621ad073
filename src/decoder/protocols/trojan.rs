//! Trojan share-link decoder
//!
//! Decodes `trojan://password@host:port?params`. Trojan always runs over
//! TLS; `sni` falls back to the server hostname.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use tracing::{trace, warn};
use url::Url;

use crate::decoder::compat::DecoderConfig;
use crate::decoder::transport::{QueryParams, build_transport};
use crate::naming::placeholder_name;
use crate::node::{ProxyNode, TransportKind, TrojanNode};

use super::LinkDecoder;

/// Decoder for Trojan (trojan://) links
pub struct TrojanDecoder;

impl LinkDecoder for TrojanDecoder {
    fn scheme(&self) -> &str {
        "trojan"
    }

    fn decode(&self, link: &str, _config: &DecoderConfig) -> Result<ProxyNode> {
        trace!("Decoding Trojan link");
        let url = Url::parse(link).map_err(|e| anyhow!("Failed to parse Trojan link: {}", e))?;

        let password = urlencoding::decode(url.username())
            .map_err(|e| anyhow!("Invalid Trojan password encoding: {}", e))?
            .into_owned();
        if password.is_empty() {
            bail!("Trojan link missing password");
        }

        let server = url
            .host_str()
            .ok_or_else(|| anyhow!("Trojan link missing host"))?
            .trim()
            .to_string();

        let port = url
            .port()
            .ok_or_else(|| anyhow!("Trojan link missing port"))?;
        if port == 0 {
            bail!("Trojan link has port 0");
        }

        let query = QueryParams(url.query_pairs().into_owned().collect::<HashMap<_, _>>());
        let params = &query.0;

        let sni = params
            .get("sni")
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| server.clone());

        let mut node = TrojanNode {
            name: placeholder_name(),
            server,
            port,
            password,
            tls: true,
            sni,
            ..Default::default()
        };

        if let Some(value) = params.get("skip-cert-verify") {
            node.skip_cert_verify = Some(value.to_lowercase() == "true");
        }
        if let Some(value) = params.get("udp") {
            node.udp = Some(value.to_lowercase() == "true");
        }
        node.client_fingerprint = params.get("client-fingerprint").cloned();

        if let Some(net) = params.get("type") {
            node.network = match TransportKind::from_input(net) {
                Some(kind) => kind,
                None => {
                    warn!("Unrecognized Trojan transport '{}', falling back to tcp", net);
                    TransportKind::Tcp
                }
            };
        }

        // quic options have no place on a Trojan record and are discarded
        let build = build_transport(node.network, &query);
        node.ws_opts = build.ws_opts;
        node.grpc_opts = build.grpc_opts;
        node.http_opts = build.http_opts;
        node.h2_opts = build.h2_opts;

        Ok(ProxyNode::Trojan(node))
    }
}
