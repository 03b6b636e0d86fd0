//! Provisioning Settings
//!
//! Server-side parameters baked into every generated peer config. All
//! fields have defaults so a settings file only needs the overrides.

use crate::document::ServerEndpoint;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Provisioning settings (`[provision]` table of the bot config)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    /// Peer subnet served by the WireGuard interface
    pub subnet: Ipv4Net,
    /// Addresses never handed to peers
    pub reserved: Vec<Ipv4Addr>,
    /// DNS server written into peer configs
    pub dns: IpAddr,
    /// Public host of the WireGuard server
    pub server_host: String,
    /// Listen port of the WireGuard server
    pub server_port: u16,
    /// Directory holding one `{peer}.conf` per peer
    pub configs_dir: PathBuf,
    /// File with the server's base64 public key
    pub server_public_key_path: PathBuf,
    /// WireGuard interface peers are added to
    pub interface: String,
    /// `wg` binary
    pub wg_program: PathBuf,
    /// Run `wg set` through `sudo`
    pub use_sudo: bool,
}

impl ProvisionSettings {
    /// Endpoint announced to peers
    pub fn endpoint(&self) -> ServerEndpoint {
        ServerEndpoint::new(self.server_host.clone(), self.server_port)
    }
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            subnet: Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 0), 24)
                .expect("Hardcoded prefix length should be valid"),
            reserved: vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)],
            dns: IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
            server_host: "45.142.215.232".to_string(),
            server_port: 51820, // Standard WireGuard port
            configs_dir: PathBuf::from("/etc/wireguard/clients"),
            server_public_key_path: PathBuf::from("/etc/wireguard/server/server.key.pub"),
            interface: "wg0".to_string(),
            wg_program: PathBuf::from("wg"),
            use_sudo: true,
        }
    }
}
