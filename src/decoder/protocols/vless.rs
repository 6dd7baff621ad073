//! VLESS share-link decoder
//!
//! Decodes the URI form `vless://uuid@host:port?params#fragment`. The
//! structured-object form is handled by the registry's structured path; both
//! apply the same flow mapping and REALITY validation.

use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, trace, warn};
use url::Url;

use crate::decoder::compat::DecoderConfig;
use crate::decoder::repair::validate_reality;
use crate::decoder::transport::{QueryParams, build_transport};
use crate::naming::placeholder_name;
use crate::node::{ProxyNode, TransportKind, VLessNode};

use super::LinkDecoder;

/// Decoder for VLESS (vless://) links
pub struct VLessDecoder;

impl LinkDecoder for VLessDecoder {
    fn scheme(&self) -> &str {
        "vless"
    }

    fn decode(&self, link: &str, config: &DecoderConfig) -> Result<ProxyNode> {
        trace!("Decoding VLESS link");
        let url = Url::parse(link).map_err(|e| anyhow!("Failed to parse VLESS link: {}", e))?;

        let uuid = url.username().to_string();
        if uuid.is_empty() {
            bail!("VLESS link missing UUID");
        }

        let server = url
            .host_str()
            .ok_or_else(|| anyhow!("VLESS link missing host"))?
            .trim()
            .to_string();

        let port = url.port().ok_or_else(|| anyhow!("VLESS link missing port"))?;
        if port == 0 {
            bail!("VLESS link has port 0");
        }

        let query = QueryParams(url.query_pairs().into_owned().collect::<HashMap<_, _>>());
        let params = &query.0;

        let mut node = VLessNode {
            name: placeholder_name(),
            server,
            port,
            uuid,
            ..Default::default()
        };

        let security = params.get("security").map(String::as_str).unwrap_or("");
        if !security.is_empty() {
            node.tls = Some(security == "tls" || security == "reality");
        }

        if let Some(net) = params.get("type") {
            node.network = match TransportKind::from_input(net) {
                Some(kind) => kind,
                None => {
                    warn!("Unrecognized VLESS transport '{}', falling back to tcp", net);
                    TransportKind::Tcp
                }
            };
        }

        if let Some(value) = params.get("skip-cert-verify") {
            node.skip_cert_verify = Some(value.to_lowercase() == "true");
        }

        if let Some(flow) = params.get("flow").filter(|f| !f.is_empty()) {
            match config.map_flow(flow) {
                Some(mapped) => node.flow = Some(mapped.to_string()),
                None => warn!("Unsupported XTLS flow type '{}', dropped", flow),
            }
        }

        // sni falls back to the server hostname
        let sni = params
            .get("sni")
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| node.server.clone());
        node.sni = Some(sni);

        let build = build_transport(node.network, &query);
        node.ws_opts = build.ws_opts;
        node.grpc_opts = build.grpc_opts;
        node.http_opts = build.http_opts;
        node.h2_opts = build.h2_opts;
        node.quic_opts = build.quic_opts;
        if build.force_tls {
            node.tls = Some(true);
        }

        if security == "reality" {
            let pbk = params.get("pbk").map(String::as_str).unwrap_or("");
            let sid = params.get("sid").map(String::as_str).unwrap_or("");
            match validate_reality(pbk, sid) {
                Ok(opts) => {
                    node.reality_opts = Some(opts);
                    node.client_fingerprint = params.get("fp").cloned();
                }
                Err(e) => debug!("Invalid REALITY params in VLESS link, dropped: {:#}", e),
            }
        }

        Ok(ProxyNode::VLess(node))
    }
}
