use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

/// Runtime configuration for the profile server.
///
/// Every option can be set on the command line or through the environment;
/// deployment scripts set the `PROFILE_*` variables and pass no flags.
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Host/IP to listen on
    #[arg(long, default_value = "0.0.0.0", env = "PROFILE_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5000, env = "PROFILE_PORT")]
    pub port: u16,

    /// Path of the profile database
    #[arg(long, value_name = "FILE", default_value = "data/profiles.db", env = "PROFILE_DB")]
    pub db_path: PathBuf,

    /// Directory holding the profile page and static assets
    #[arg(long, value_name = "DIR", default_value = "public", env = "PROFILE_PUBLIC_DIR")]
    pub public_dir: PathBuf,

    /// Mount `DELETE /api/profiles`, which removes every record.
    /// Off unless explicitly requested.
    #[arg(long, env = "PROFILE_ENABLE_PURGE")]
    pub enable_purge: bool,
}

impl ServerConfig {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    /// The page the renderer substitutes tokens into.
    pub fn page_path(&self) -> PathBuf {
        self.public_dir.join("index.html")
    }
}
