//! Structured-object input path
//!
//! Subscription lines are not always share links; some feeds carry one
//! proxy object per line, as inline YAML or JSON in the same interchange
//! schema the decoders emit. Those lines deserialize straight into
//! [`ProxyNode`] and then pass through the same normalization rules the
//! per-scheme decoders apply.

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::decoder::compat::DecoderConfig;
use crate::decoder::repair::validate_reality;
use crate::naming::placeholder_name;
use crate::node::{ProxyNode, RealityOptions};

/// Decodes one structured proxy object and normalizes it.
pub fn decode_structured(line: &str, config: &DecoderConfig) -> Result<ProxyNode> {
    let node: ProxyNode =
        serde_yaml::from_str(line).context("Line is not a proxy object")?;
    normalize(node, config)
}

/// Applies the shared validation and normalization rules to a deserialized
/// node, mirroring what each scheme decoder enforces on its own links.
fn normalize(mut node: ProxyNode, config: &DecoderConfig) -> Result<ProxyNode> {
    if node.server().trim().is_empty() {
        bail!("Proxy object missing server");
    }
    if node.port() == 0 {
        bail!("Proxy object has port 0");
    }
    if node.name().is_empty() {
        node = node.with_name(placeholder_name());
    }

    match &mut node {
        ProxyNode::VMess(vmess) => {
            vmess.server = vmess.server.trim().to_string();
            if vmess.uuid.is_empty() {
                bail!("VMess object missing uuid");
            }
            if vmess.cipher.is_empty() || vmess.cipher == "none" {
                vmess.cipher = "auto".to_string();
            }
            if !config.vmess_cipher_supported(&vmess.cipher) {
                bail!("VMess cipher '{}' is not supported", vmess.cipher);
            }
            if vmess.network.forces_tls() {
                vmess.tls = Some(true);
            }
            vmess.reality_opts = revalidate_reality(vmess.reality_opts.take());
        }
        ProxyNode::VLess(vless) => {
            vless.server = vless.server.trim().to_string();
            if vless.uuid.is_empty() {
                bail!("VLESS object missing uuid");
            }
            if let Some(flow) = vless.flow.take().filter(|f| !f.is_empty()) {
                match config.map_flow(&flow) {
                    Some(mapped) => vless.flow = Some(mapped.to_string()),
                    None => warn!("Unsupported XTLS flow type '{}', dropped", flow),
                }
            }
            if vless.network.forces_tls() {
                vless.tls = Some(true);
            }
            vless.reality_opts = revalidate_reality(vless.reality_opts.take());
        }
        ProxyNode::Shadowsocks(ss) => {
            ss.server = ss.server.trim().to_string();
            if ss.password.is_empty() {
                bail!("Shadowsocks object missing password");
            }
            ss.cipher = ss.cipher.to_lowercase();
            if !config.cipher_supported(&ss.cipher) {
                bail!("Shadowsocks cipher '{}' is not supported", ss.cipher);
            }
        }
        ProxyNode::ShadowsocksR(ssr) => {
            ssr.server = ssr.server.trim().to_string();
            if ssr.password.is_empty() {
                bail!("ShadowsocksR object missing password");
            }
            ssr.cipher = ssr.cipher.to_lowercase();
            if !config.cipher_supported(&ssr.cipher) {
                bail!("ShadowsocksR cipher '{}' is not supported", ssr.cipher);
            }
        }
        ProxyNode::Trojan(trojan) => {
            trojan.server = trojan.server.trim().to_string();
            if trojan.password.is_empty() {
                bail!("Trojan object missing password");
            }
            trojan.tls = true;
            if trojan.sni.is_empty() {
                trojan.sni = trojan.server.clone();
            }
        }
        ProxyNode::Hysteria2(hy2) => {
            hy2.server = hy2.server.trim().to_string();
            if hy2.password.is_empty() {
                bail!("Hysteria2 object missing password");
            }
            hy2.tls = true;
            if hy2.sni.is_empty() {
                hy2.sni = hy2.server.clone();
            }
        }
    }

    Ok(node)
}

/// Re-runs REALITY validation on an object-supplied block; an invalid block
/// is dropped while the node survives.
fn revalidate_reality(opts: Option<RealityOptions>) -> Option<RealityOptions> {
    let opts = opts?;
    match validate_reality(&opts.public_key, &opts.short_id) {
        Ok(valid) => Some(valid),
        Err(e) => {
            debug!("Invalid REALITY block in proxy object, dropped: {:#}", e);
            None
        }
    }
}
