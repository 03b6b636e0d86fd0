//! Peer Config Document
//!
//! Renders and parses the `wg-quick` style config handed to users:
//!
//! ```text
//! [Interface]
//! PrivateKey = <client private key>
//! Address = 10.0.0.17
//! DNS = 8.8.8.8
//!
//! [Peer]
//! PublicKey = <server public key>
//! Endpoint = vpn.example.org:51820
//! AllowedIPs = 0.0.0.0/0
//! ```

use crate::keys::{KeyError, PrivateKey, PublicKey};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Route that sends all IPv4 traffic through the tunnel
pub const ALL_TRAFFIC: &str = "0.0.0.0/0";

/// Server endpoint (host + port)
///
/// The host is kept as a string so DNS names work as well as literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerEndpoint {
    /// Hostname or IP literal
    pub host: String,
    /// UDP port
    pub port: u16,
}

impl ServerEndpoint {
    /// Create a new endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerEndpoint {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocumentError::InvalidValue {
            field: "Endpoint",
            value: s.to_string(),
        };

        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse().map_err(|_| invalid())?;

        Ok(Self::new(host, port))
    }
}

/// A complete peer configuration
#[derive(Debug, Clone)]
pub struct PeerDocument {
    /// Client private key
    pub private_key: PrivateKey,
    /// Client tunnel address
    pub address: Ipv4Addr,
    /// DNS server used inside the tunnel
    pub dns: IpAddr,
    /// Server public key
    pub server_public_key: PublicKey,
    /// Server endpoint
    pub endpoint: ServerEndpoint,
    /// Routed destinations
    pub allowed_ips: String,
}

impl PeerDocument {
    /// Create a document routing all traffic through the server
    pub fn new(
        private_key: PrivateKey,
        address: Ipv4Addr,
        dns: IpAddr,
        server_public_key: PublicKey,
        endpoint: ServerEndpoint,
    ) -> Self {
        Self {
            private_key,
            address,
            dns,
            server_public_key,
            endpoint,
            allowed_ips: ALL_TRAFFIC.to_string(),
        }
    }

    /// Render to config file text
    pub fn render(&self) -> String {
        format!(
            "[Interface]\n\
             PrivateKey = {}\n\
             Address = {}\n\
             DNS = {}\n\
             \n\
             [Peer]\n\
             PublicKey = {}\n\
             Endpoint = {}\n\
             AllowedIPs = {}\n",
            self.private_key.to_base64(),
            self.address,
            self.dns,
            self.server_public_key.to_base64(),
            self.endpoint,
            self.allowed_ips,
        )
    }

    /// Parse config file text
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        let sections = Sections::parse(content);

        let private_key = PrivateKey::from_base64(sections.require("interface", "PrivateKey")?)?;
        let address = parse_ipv4(sections.require("interface", "Address")?)?;
        let dns_raw = sections.require("interface", "DNS")?;
        // Several DNS servers may be listed; the first one is ours
        let dns_first = dns_raw.split(',').next().unwrap_or_default().trim();
        let dns = dns_first.parse().map_err(|_| DocumentError::InvalidValue {
            field: "DNS",
            value: dns_raw.to_string(),
        })?;

        let server_public_key = PublicKey::from_base64(sections.require("peer", "PublicKey")?)?;
        let endpoint = sections.require("peer", "Endpoint")?.parse()?;
        let allowed_ips = sections
            .get("peer", "AllowedIPs")
            .unwrap_or(ALL_TRAFFIC)
            .to_string();

        Ok(Self {
            private_key,
            address,
            dns,
            server_public_key,
            endpoint,
            allowed_ips,
        })
    }

    /// Write the rendered document to `path`, which must not exist yet.
    ///
    /// The text is staged in a hidden sibling file and hard-linked into
    /// place, so `path` either holds the complete document or nothing. An
    /// existing `path` is left untouched and reported as `AlreadyExists`.
    /// The file holds a private key, so on Unix it is created `0600`.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let staging = staging_path(path)?;

        let result = self.write_staged(&staging, path).await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove staging file {}: {}", staging.display(), e);
            }
        }
        result
    }

    async fn write_staged(&self, staging: &Path, path: &Path) -> std::io::Result<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(staging).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::hard_link(staging, path).await
    }
}

/// `dir/.name.tmp` next to `dir/name`
fn staging_path(path: &Path) -> std::io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;

    let mut staged = std::ffi::OsString::from(".");
    staged.push(name);
    staged.push(".tmp");
    Ok(path.with_file_name(staged))
}

/// Recover only the client address from config text.
///
/// Used on the fast path where nothing else in the file matters.
pub fn parse_address(content: &str) -> Result<Ipv4Addr, DocumentError> {
    parse_ipv4(Sections::parse(content).require("interface", "Address")?)
}

fn parse_ipv4(raw: &str) -> Result<Ipv4Addr, DocumentError> {
    // `Address` may be a list and may carry a prefix: "10.0.0.5/32, fd00::5/128"
    raw.split(',')
        .map(|part| part.trim())
        .map(|part| part.split_once('/').map_or(part, |(addr, _)| addr))
        .find_map(|addr| addr.parse::<Ipv4Addr>().ok())
        .ok_or_else(|| DocumentError::InvalidValue {
            field: "Address",
            value: raw.to_string(),
        })
}

/// Key/value pairs grouped by lowercase section name
struct Sections<'a> {
    values: HashMap<(String, String), &'a str>,
}

impl<'a> Sections<'a> {
    fn parse(content: &'a str) -> Self {
        let mut values = HashMap::new();
        let mut section = String::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = name.trim().to_ascii_lowercase();
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                // First occurrence wins
                values
                    .entry((section.clone(), key.trim().to_ascii_lowercase()))
                    .or_insert(value.trim());
            }
        }

        Self { values }
    }

    fn get(&self, section: &str, key: &str) -> Option<&'a str> {
        self.values
            .get(&(section.to_string(), key.to_ascii_lowercase()))
            .copied()
    }

    fn require(&self, section: &str, key: &'static str) -> Result<&'a str, DocumentError> {
        self.get(section, key).ok_or(DocumentError::MissingField(key))
    }
}

/// Document errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid key: {0}")]
    Key(#[from] KeyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn sample() -> PeerDocument {
        let client = KeyPair::generate();
        let server = KeyPair::generate();
        PeerDocument::new(
            client.private,
            Ipv4Addr::new(10, 0, 0, 17),
            IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
            server.public,
            ServerEndpoint::new("45.142.215.232", 51820),
        )
    }

    #[test]
    fn test_render_layout() {
        let doc = sample();
        let text = doc.render();

        let expected = format!(
            "[Interface]\nPrivateKey = {}\nAddress = 10.0.0.17\nDNS = 8.8.8.8\n\n\
             [Peer]\nPublicKey = {}\nEndpoint = 45.142.215.232:51820\nAllowedIPs = 0.0.0.0/0\n",
            doc.private_key.to_base64(),
            doc.server_public_key.to_base64(),
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_parse_rendered() {
        let doc = sample();
        let parsed = PeerDocument::parse(&doc.render()).unwrap();

        assert_eq!(parsed.address, doc.address);
        assert_eq!(parsed.dns, doc.dns);
        assert_eq!(parsed.endpoint, doc.endpoint);
        assert_eq!(parsed.server_public_key, doc.server_public_key);
        assert_eq!(parsed.private_key.to_bytes(), doc.private_key.to_bytes());
        assert_eq!(parsed.allowed_ips, ALL_TRAFFIC);
        assert_eq!(parse_address(&doc.render()).unwrap(), doc.address);
    }

    #[test]
    fn test_parse_address_variants() {
        let text = "# managed by hand\n[interface]\naddress=10.0.0.9/32, fd00::9/128\n";
        assert_eq!(parse_address(text).unwrap(), Ipv4Addr::new(10, 0, 0, 9));

        // Trailing whitespace after the route, as older files have
        let text = "[Interface]\nAddress = 10.0.0.44\n[Peer]\nAllowedIPs = 0.0.0.0/0 ";
        assert_eq!(parse_address(text).unwrap(), Ipv4Addr::new(10, 0, 0, 44));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_address("[Interface]\nDNS = 8.8.8.8\n"),
            Err(DocumentError::MissingField("Address"))
        ));
        assert!(matches!(
            parse_address("[Interface]\nAddress = nope\n"),
            Err(DocumentError::InvalidValue { field: "Address", .. })
        ));
        // Address in the wrong section does not count
        assert!(parse_address("[Peer]\nAddress = 10.0.0.3\n").is_err());
    }

    #[test]
    fn test_endpoint_parse() {
        let ep: ServerEndpoint = "vpn.example.org:51820".parse().unwrap();
        assert_eq!(ep, ServerEndpoint::new("vpn.example.org", 51820));

        assert!("vpn.example.org".parse::<ServerEndpoint>().is_err());
        assert!(":51820".parse::<ServerEndpoint>().is_err());
        assert!("host:99999".parse::<ServerEndpoint>().is_err());
    }

    #[tokio::test]
    async fn test_write_to() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peer.conf");
        let doc = sample();

        doc.write_to(&path).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, doc.render());
        assert!(!dir.path().join(".peer.conf.tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_write_to_keeps_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peer.conf");
        std::fs::write(&path, "operator copy").unwrap();

        let err = sample().write_to(&path).await.unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "operator copy");
        assert!(!dir.path().join(".peer.conf.tmp").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_write_leaves_no_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("peer.conf");
        let staging = dir.path().join(".peer.conf.tmp");
        // Every write to /dev/full fails with ENOSPC
        std::os::unix::fs::symlink("/dev/full", &staging).unwrap();

        let err = sample().write_to(&path).await.unwrap_err();

        assert_eq!(err.raw_os_error(), Some(28));
        assert!(!path.exists());
        assert!(std::fs::symlink_metadata(&staging).is_err());
    }
}
