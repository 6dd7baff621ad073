#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use std::io::Read;

use clap::Parser;
use linkmill::cli::Args;
use linkmill::decoder::{DecoderConfig, DecoderRegistry};
use linkmill::node::ProxyNode;
use serde::Serialize;
use tracing::Level;

fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .init();

    if let Err(e) = run(args) {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Output document, a `proxies:` list in the Clash layout.
#[derive(Serialize)]
struct ProxyDocument {
    proxies: Vec<ProxyNode>,
}

fn run(args: Args) -> anyhow::Result<()> {
    let content = match args.input.as_deref() {
        Some(path) => {
            tracing::info!("Reading links from: {}", path);
            std::fs::read_to_string(path)?
        }
        None => {
            tracing::info!("Reading links from stdin");
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config = DecoderConfig::default();
    let registry = DecoderRegistry::with_builtin_decoders();
    let nodes = registry.decode_lines(&content, &config);
    tracing::info!("Decoded {} proxy nodes", nodes.len());

    let document = serde_yaml::to_string(&ProxyDocument { proxies: nodes })?;
    match args.output.as_deref() {
        Some(path) => {
            std::fs::write(path, document)?;
            tracing::info!("Wrote proxy list to: {}", path);
        }
        None => print!("{}", document),
    }

    Ok(())
}
