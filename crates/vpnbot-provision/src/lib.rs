//! vpnbot Provision - WireGuard Peer Provisioning
//!
//! Turns a peer identity into a ready-to-use WireGuard client config:
//! picks a free address in the server subnet, generates a keypair,
//! writes the config file and registers the peer with the live server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   PeerConfigService                      │
//! │                                                          │
//! │  ┌──────────┐  ┌───────────┐  ┌──────────┐  ┌─────────┐  │
//! │  │  IpPool  │─▶│ KeySource │─▶│ Document │─▶│Registrar│  │
//! │  │ (subnet) │  │ wg genkey │  │  .conf   │  │ wg set  │  │
//! │  └──────────┘  └───────────┘  └──────────┘  └─────────┘  │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! A peer is either `NotProvisioned` or `Provisioned`. The config file on
//! disk is the only record: once it exists the peer is provisioned and
//! every later request takes the fast path.

mod command;
mod document;
mod keys;
mod peer_id;
mod pool;
mod registrar;
mod service;
mod settings;

pub use command::ToolError;
pub use document::{DocumentError, PeerDocument, ServerEndpoint, parse_address};
pub use keys::{KeyError, KeyPair, KeySource, LocalKeySource, PrivateKey, PublicKey, WgKeySource};
pub use peer_id::{PeerId, PeerIdError};
pub use pool::{IpPool, pick_address};
pub use registrar::{DryRunRegistrar, PeerRegistrar, RegistrarError, WgRegistrar};
pub use service::{PeerConfigService, PeerState, ProvisionError, ProvisionedPeer};
pub use settings::ProvisionSettings;
