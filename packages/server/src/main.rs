#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map admin server binary.
//!
//! ```text
//! map_admin_server [--config admin_map.toml]
//! ```

use std::path::PathBuf;

use clap::Parser;
use map_admin_server::{ServerConfig, run_server};

#[derive(Parser)]
#[command(name = "map_admin_server")]
#[command(about = "Admin list pages with a map of every record")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "admin_map.toml")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli.config).map_err(std::io::Error::other)?;

    run_server(config).await
}
