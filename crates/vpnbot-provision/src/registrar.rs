//! Server Peer Registration
//!
//! Adds a freshly provisioned peer to the running WireGuard interface.

use crate::command::{ToolError, run_tool};
use crate::keys::PublicKey;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing::{error, info};

/// Registration errors
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    #[error("Could not add peer to {interface}: {source}")]
    Tool {
        interface: String,
        #[source]
        source: ToolError,
    },
}

/// Sink for new peers on the server side
#[async_trait]
pub trait PeerRegistrar: Send + Sync {
    /// Allow `public_key` to use `address` on the server
    async fn register(&self, public_key: &PublicKey, address: Ipv4Addr) -> Result<(), RegistrarError>;
}

/// Registrar that runs `wg set <iface> peer <key> allowed-ips <addr>/32`
#[derive(Debug, Clone)]
pub struct WgRegistrar {
    /// `wg` binary
    program: PathBuf,
    /// Interface name (e.g. `wg0`)
    interface: String,
    /// Prefix the command with `sudo`
    use_sudo: bool,
}

impl WgRegistrar {
    /// Create a registrar for `interface`
    pub fn new(program: impl Into<PathBuf>, interface: impl Into<String>, use_sudo: bool) -> Self {
        Self {
            program: program.into(),
            interface: interface.into(),
            use_sudo,
        }
    }

    /// Command line for a registration, program first
    fn command_line(&self, public_key: &PublicKey, address: Ipv4Addr) -> Vec<String> {
        let mut argv = Vec::with_capacity(8);
        if self.use_sudo {
            argv.push("sudo".to_string());
        }
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend([
            "set".to_string(),
            self.interface.clone(),
            "peer".to_string(),
            public_key.to_base64(),
            "allowed-ips".to_string(),
            format!("{}/32", address),
        ]);
        argv
    }
}

#[async_trait]
impl PeerRegistrar for WgRegistrar {
    async fn register(&self, public_key: &PublicKey, address: Ipv4Addr) -> Result<(), RegistrarError> {
        let argv = self.command_line(public_key, address);
        let args: Vec<&str> = argv[1..].iter().map(String::as_str).collect();

        match run_tool(&argv[0], &args, None).await {
            Ok(_) => {
                info!("Registered peer {:?} as {} on {}", public_key, address, self.interface);
                Ok(())
            }
            Err(source) => {
                error!("Failed to register peer {:?}: {}", public_key, source);
                Err(RegistrarError::Tool {
                    interface: self.interface.clone(),
                    source,
                })
            }
        }
    }
}

/// Registrar that only logs (no live server)
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunRegistrar;

#[async_trait]
impl PeerRegistrar for DryRunRegistrar {
    async fn register(&self, public_key: &PublicKey, address: Ipv4Addr) -> Result<(), RegistrarError> {
        info!("Dry run: would register peer {:?} as {}", public_key, address);
        Ok(())
    }
}
