//! Share-Link Decoding Module
//!
//! This module provides functionality for:
//! - Decoding proxy share links (ss://, ssr://, vmess://, vless://,
//!   trojan://, hysteria2://) into normalized node records
//! - Repairing the malformed base64 real-world links carry
//! - Validating cipher suites, XTLS flows, and REALITY parameters
//! - Accepting structured per-line proxy objects alongside links

pub mod compat;
pub mod protocols;
pub mod repair;
pub mod structured;
pub mod transport;

pub use compat::DecoderConfig;
pub use protocols::{DecoderRegistry, LinkDecoder};
