use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dagway_gateway::GatewayConfig;
use dagway_store::StreamConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Local file or directory imported into the content node on first use.
    pub root: Option<PathBuf>,
    /// Answer cross-origin GET/HEAD requests from any origin.
    pub allow_any_origin: bool,
    pub gateway: GatewayConfig,
    pub stream: StreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            root: None,
            allow_any_origin: true,
            gateway: GatewayConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a TOML configuration file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert!(c.root.is_none());
        assert!(c.allow_any_origin);
        assert_eq!(c.gateway.prefix, "ipfs");
        assert_eq!(c.stream.chunk_size, 64 * 1024);
    }

    #[test]
    fn partial_toml() {
        let c = ServerConfig::from_toml(
            r#"
            bind_addr = "0.0.0.0:9000"
            root = "./site"

            [gateway]
            prefix = "dag"
            index_names = ["index.html", "index.htm"]

            [stream]
            chunk_size = 1024
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 9000);
        assert_eq!(c.root, Some(PathBuf::from("./site")));
        assert_eq!(c.gateway.prefix, "dag");
        assert_eq!(c.gateway.index_names.len(), 2);
        assert_eq!(c.gateway.cache_generation, "dagway-v1");
        assert_eq!(c.stream.chunk_size, 1024);
        assert_eq!(c.stream.channel_capacity, 8);
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dagway.toml");
        std::fs::write(&path, "bind_addr = 12").unwrap();
        let err = ServerConfig::from_file(&path).unwrap_err();
        assert!(matches!(&err, ServerError::Config(msg) if msg.contains("dagway.toml")));

        std::fs::write(&path, "allow_any_origin = false").unwrap();
        let c = ServerConfig::from_file(&path).unwrap();
        assert!(!c.allow_any_origin);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/dagway.toml")).unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
