use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// `[server]` section of `gitgraph.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind: SocketAddr,
    /// Allow any origin instead of localhost only
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 3030)),
            enable_cors: false,
        }
    }
}
