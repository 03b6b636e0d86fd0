//! Peer Config Service
//!
//! Single entry point for provisioning. Given a peer identity it either
//! returns the existing config or provisions a new one end to end.
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = PeerConfigService::new(
//!     ProvisionSettings::default(),
//!     Arc::new(WgKeySource::default()),
//!     Arc::new(WgRegistrar::new("wg", "wg0", true)),
//! )
//! .await?;
//!
//! let peer = service.get_or_create(&PeerId::from_user(42)).await?;
//! println!("config at {}", peer.path.display());
//! ```

use crate::document::{DocumentError, PeerDocument, parse_address};
use crate::keys::{KeyError, KeySource, PublicKey};
use crate::peer_id::PeerId;
use crate::pool::IpPool;
use crate::registrar::{PeerRegistrar, RegistrarError};
use crate::settings::ProvisionSettings;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Provisioning state of a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// No config file yet
    NotProvisioned,
    /// Config file exists and names this address
    Provisioned { address: Ipv4Addr },
}

impl PeerState {
    /// Check if the peer already has a config
    pub fn is_provisioned(&self) -> bool {
        matches!(self, PeerState::Provisioned { .. })
    }
}

/// Result of [`PeerConfigService::get_or_create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedPeer {
    /// Path of the config file
    pub path: PathBuf,
    /// Tunnel address of the peer
    pub address: Ipv4Addr,
    /// `true` if this call provisioned the peer
    pub created: bool,
}

/// Provisioning errors
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("No address available")]
    Exhausted,

    #[error("Key generation failed: {0}")]
    KeyGeneration(#[from] KeyError),

    #[error("Cannot read server public key {}: {source}", path.display())]
    ServerKeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid server public key in {}: {source}", path.display())]
    ServerKeyInvalid {
        path: PathBuf,
        #[source]
        source: KeyError,
    },

    #[error("Peer registration failed: {0}")]
    Registration(#[from] RegistrarError),

    #[error("Unreadable peer config {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Peer Config Service
///
/// Owns the address pool. The pool mutex is held for a whole
/// `get_or_create` call, so check, allocate, write and register happen
/// as one critical section.
pub struct PeerConfigService {
    /// Settings
    settings: ProvisionSettings,
    /// Keypair source
    keys: Arc<dyn KeySource>,
    /// Server-side registration
    registrar: Arc<dyn PeerRegistrar>,
    /// Address pool
    pool: Mutex<IpPool>,
}

impl PeerConfigService {
    /// Create the service.
    ///
    /// Creates the configs directory if needed and rebuilds the address
    /// pool from the configs already on disk.
    pub async fn new(
        settings: ProvisionSettings,
        keys: Arc<dyn KeySource>,
        registrar: Arc<dyn PeerRegistrar>,
    ) -> Result<Self, ProvisionError> {
        let dir = settings.configs_dir.clone();
        fs::create_dir_all(&dir).await.map_err(ProvisionError::io(&dir))?;

        let mut pool = IpPool::new(settings.subnet, settings.reserved.iter().copied());
        let restored = scan_configs(&dir, &mut pool).await?;

        info!(
            "Peer pool {} ready: {} existing peers, {} addresses free",
            pool.subnet(),
            restored,
            pool.available()
        );

        Ok(Self {
            settings,
            keys,
            registrar,
            pool: Mutex::new(pool),
        })
    }

    /// Settings in use
    pub fn settings(&self) -> &ProvisionSettings {
        &self.settings
    }

    /// Deterministic config path for a peer
    pub fn config_path(&self, peer: &PeerId) -> PathBuf {
        self.settings.configs_dir.join(peer.file_name())
    }

    /// Current provisioning state of a peer
    ///
    /// Waits for any provisioning in flight to finish first.
    pub async fn state(&self, peer: &PeerId) -> Result<PeerState, ProvisionError> {
        let _pool = self.pool.lock().await;
        let state = match existing_address(&self.config_path(peer)).await? {
            Some(address) => PeerState::Provisioned { address },
            None => PeerState::NotProvisioned,
        };
        Ok(state)
    }

    /// Number of addresses still free
    pub async fn available_addresses(&self) -> usize {
        self.pool.lock().await.available()
    }

    /// Return the peer's config, provisioning it first if needed
    pub async fn get_or_create(&self, peer: &PeerId) -> Result<ProvisionedPeer, ProvisionError> {
        let path = self.config_path(peer);
        let mut pool = self.pool.lock().await;

        // Fast path: config already on disk
        if let Some(address) = existing_address(&path).await? {
            if pool.reserve(address) {
                debug!("Re-reserved {} for existing peer {}", address, peer);
            }
            return Ok(ProvisionedPeer {
                path,
                address,
                created: false,
            });
        }

        let Some(address) = pool.allocate() else {
            warn!("No free address left in {} for peer {}", pool.subnet(), peer);
            return Err(ProvisionError::Exhausted);
        };

        match self.provision(&path, address).await {
            Ok(()) => {
                info!("Provisioned peer {} with address {}", peer, address);
                Ok(ProvisionedPeer {
                    path,
                    address,
                    created: true,
                })
            }
            Err(e) => {
                error!("Provisioning peer {} failed: {}", peer, e);
                pool.release(address);
                Err(e)
            }
        }
    }

    /// Generate keys, write the config and register the peer
    async fn provision(&self, path: &Path, address: Ipv4Addr) -> Result<(), ProvisionError> {
        let keypair = self.keys.generate_keypair().await?;
        let server_key = self.server_public_key().await?;

        let document = PeerDocument::new(
            keypair.private,
            address,
            self.settings.dns,
            server_key,
            self.settings.endpoint(),
        );
        document.write_to(path).await.map_err(ProvisionError::io(path))?;

        if let Err(e) = self.registrar.register(&keypair.public, address).await {
            // An unregistered config must not be served on the fast path
            if let Err(rm) = fs::remove_file(path).await {
                warn!("Could not remove unregistered config {}: {}", path.display(), rm);
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// Read the server's public key
    async fn server_public_key(&self) -> Result<PublicKey, ProvisionError> {
        let path = &self.settings.server_public_key_path;

        let raw = fs::read_to_string(path)
            .await
            .map_err(|source| ProvisionError::ServerKeyRead {
                path: path.clone(),
                source,
            })?;

        PublicKey::from_base64(&raw).map_err(|source| ProvisionError::ServerKeyInvalid {
            path: path.clone(),
            source,
        })
    }
}

/// Address recorded in an existing config, `None` if there is no file
async fn existing_address(path: &Path) -> Result<Option<Ipv4Addr>, ProvisionError> {
    match fs::read_to_string(path).await {
        Ok(content) => parse_address(&content)
            .map(Some)
            .map_err(|source| ProvisionError::Document {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ProvisionError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reserve the addresses of every `*.conf` in `dir`
async fn scan_configs(dir: &Path, pool: &mut IpPool) -> Result<usize, ProvisionError> {
    let mut entries = fs::read_dir(dir).await.map_err(ProvisionError::io(dir))?;
    let mut restored = 0;

    while let Some(entry) = entries.next_entry().await.map_err(ProvisionError::io(dir))? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("conf") {
            continue;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable config {}: {}", path.display(), e);
                continue;
            }
        };

        match parse_address(&content) {
            Ok(addr) if pool.reserve(addr) => restored += 1,
            Ok(addr) if !pool.subnet().contains(&addr) => {
                warn!("Config {} uses {} outside {}", path.display(), addr, pool.subnet());
            }
            Ok(addr) => {
                warn!("Config {} reuses already reserved address {}", path.display(), addr);
            }
            Err(e) => warn!("Skipping config {}: {}", path.display(), e),
        }
    }

    Ok(restored)
}
