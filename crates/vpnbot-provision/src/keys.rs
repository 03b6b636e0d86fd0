//! WireGuard Key Management
//!
//! Curve25519 key types plus the `KeySource` capability that produces a
//! fresh keypair for every new peer.
//!
//! Two sources are provided:
//! - [`WgKeySource`]: shells out to `wg genkey` / `wg pubkey`
//! - [`LocalKeySource`]: generates the pair in process

use crate::command::{ToolError, run_tool};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::rngs::OsRng;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

/// Client private key, as written into the `PrivateKey =` line
#[derive(Clone)]
pub struct PrivateKey(StaticSecret);

impl PrivateKey {
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(OsRng))
    }

    /// Parse the base64 text `wg genkey` prints (surrounding whitespace ignored)
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        decode_key(text).map(|bytes| Self(StaticSecret::from(bytes)))
    }

    /// Public half, as `wg pubkey` would derive it
    pub fn public_key(&self) -> PublicKey {
        PublicKey(X25519Public::from(&self.0))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Peer or server public key, the identity `wg set ... peer` takes
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(X25519Public);

impl PublicKey {
    /// Parse base64 text, e.g. the server's `server.key.pub` file
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        decode_key(text).map(|bytes| Self(X25519Public::from(bytes)))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0.as_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Enough to tell peers apart in logs
        let text = self.to_base64();
        write!(f, "PublicKey({}..)", &text[..8])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

fn decode_key(text: &str) -> Result<[u8; 32], KeyError> {
    let bytes = BASE64.decode(text.trim()).map_err(|_| KeyError::InvalidBase64)?;

    bytes.try_into().map_err(|_| KeyError::InvalidLength)
}

/// Keys for one peer. Only `public` ever leaves the config file.
#[derive(Clone)]
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let private = PrivateKey::generate();
        let public = private.public_key();
        Self { private, public }
    }

    /// Pair up externally produced keys, checking they belong together
    pub fn verified(private: PrivateKey, public: PublicKey) -> Result<Self, KeyError> {
        if private.public_key() != public {
            return Err(KeyError::Mismatch);
        }
        Ok(Self { private, public })
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Key errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid base64 encoding")]
    InvalidBase64,

    #[error("Invalid key length (expected 32 bytes)")]
    InvalidLength,

    #[error("Derived public key does not match the private key")]
    Mismatch,

    #[error("Key tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Source of fresh peer keypairs
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Produce a new keypair for a peer
    async fn generate_keypair(&self) -> Result<KeyPair, KeyError>;
}

/// Key source backed by the `wg` command-line utility
///
/// Runs `wg genkey`, then feeds the private key to `wg pubkey`.
#[derive(Debug, Clone)]
pub struct WgKeySource {
    program: PathBuf,
}

impl WgKeySource {
    /// Use the given `wg` binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for WgKeySource {
    fn default() -> Self {
        Self::new("wg")
    }
}

#[async_trait]
impl KeySource for WgKeySource {
    async fn generate_keypair(&self) -> Result<KeyPair, KeyError> {
        let program = self.program.to_string_lossy();

        let private_b64 = run_tool(&program, &["genkey"], None).await?;
        let private = PrivateKey::from_base64(&private_b64)?;

        let public_b64 = run_tool(&program, &["pubkey"], Some(&private_b64)).await?;
        let public = PublicKey::from_base64(&public_b64)?;

        let pair = KeyPair::verified(private, public)?;
        debug!("Generated keypair via {}: {:?}", program, pair.public);
        Ok(pair)
    }
}

/// In-process key source (no external tools)
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKeySource;

#[async_trait]
impl KeySource for LocalKeySource {
    async fn generate_keypair(&self) -> Result<KeyPair, KeyError> {
        Ok(KeyPair::generate())
    }
}
