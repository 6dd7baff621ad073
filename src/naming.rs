//! Node naming
//!
//! Every decoded node gets a synthetic placeholder name; whatever display
//! name the link carried (URI fragment, VMess `ps`) is ignored so a later
//! renaming pass starts from a clean slate. Geographic renaming is pluggable
//! through [`CountryResolver`] since an IP-to-country database is an
//! external concern.

use uuid::Uuid;

/// Flag used when the resolver cannot place a server.
pub const FALLBACK_FLAG: &str = "🌍";

/// Generates a placeholder name like `Node-1a2b3c4d`.
pub fn placeholder_name() -> String {
    let id = Uuid::new_v4().to_string();
    format!("Node-{}", &id[..8])
}

/// Resolves a server address to a country flag emoji.
pub trait CountryResolver: Send + Sync {
    /// Returns the flag for the server's country, or `None` when the lookup
    /// fails.
    fn country_flag(&self, server: &str) -> Option<String>;
}

/// Renames a node to `<flag> <old name>` using the resolver's verdict.
pub fn flag_name(
    node: crate::node::ProxyNode,
    resolver: &dyn CountryResolver,
) -> crate::node::ProxyNode {
    let flag = resolver
        .country_flag(node.server())
        .unwrap_or_else(|| FALLBACK_FLAG.to_string());
    let name = format!("{} {}", flag, node.name());
    node.with_name(name)
}
