use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Directory for ipc sockets given by bare name.
pub const IPC_DIR: &str = "/tmp/kesi";

/// Where the bus socket lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "address")]
pub enum Transport {
    /// Unix domain socket path.
    Ipc(PathBuf),

    Tcp { host: String, port: u16 },
}

impl Transport {
    /// Socket `{name}.sock` under [`IPC_DIR`].
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(Path::new(IPC_DIR).join(format!("{name}.sock")))
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse `tcp://host:port`, `ipc://name` or `ipc:///path/to/name.sock`.
    /// A path is used as given; a bare name lands under [`IPC_DIR`].
    pub fn parse(endpoint: &str) -> Result<Self, BusError> {
        if let Some(path) = endpoint.strip_prefix("ipc://") {
            if path.is_empty() || path.ends_with('/') {
                return Err(BusError::Endpoint(endpoint.to_string()));
            }
            if path.contains('/') {
                Ok(Self::Ipc(PathBuf::from(path)))
            } else {
                Ok(Self::ipc(path.strip_suffix(".sock").unwrap_or(path)))
            }
        } else if let Some(addr) = endpoint.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| BusError::Endpoint(endpoint.to_string()))?;
            let port = port
                .parse()
                .map_err(|_| BusError::Endpoint(endpoint.to_string()))?;
            if host.is_empty() {
                return Err(BusError::Endpoint(endpoint.to_string()));
            }
            Ok(Self::tcp(host, port))
        } else {
            Err(BusError::Endpoint(endpoint.to_string()))
        }
    }

    /// Generate the ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(path) => format!("ipc://{}", path.display()),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    /// For IPC transports, ensure the parent directory exists.
    ///
    /// ZeroMQ requires the directory to exist before binding an IPC socket.
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Self::Ipc(path) = self {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tcp() {
        let t = Transport::parse("tcp://127.0.0.1:61616").unwrap();
        assert_eq!(t, Transport::tcp("127.0.0.1", 61616));
        assert_eq!(t.to_string(), "tcp://127.0.0.1:61616");
    }

    #[test]
    fn parse_ipc_name_lands_in_default_dir() {
        let t = Transport::parse("ipc://bus").unwrap();
        assert_eq!(t, Transport::ipc("bus"));
        assert_eq!(t.endpoint(), "ipc:///tmp/kesi/bus.sock");
        assert_eq!(Transport::parse("ipc://bus.sock").unwrap(), t);
    }

    #[test]
    fn parse_ipc_path_is_kept() {
        let t = Transport::parse("ipc:///var/run/harvest/bus.sock").unwrap();
        assert_eq!(t, Transport::Ipc(PathBuf::from("/var/run/harvest/bus.sock")));
        assert_eq!(t.endpoint(), "ipc:///var/run/harvest/bus.sock");

        let default = Transport::parse("ipc:///tmp/kesi/bus.sock").unwrap();
        assert_eq!(default, Transport::ipc("bus"));
    }

    #[test]
    fn ensure_ipc_dir_creates_the_socket_parent() {
        let root = tempfile::tempdir().unwrap();
        let socket = root.path().join("nested").join("bus.sock");
        let t = Transport::parse(&format!("ipc://{}", socket.display())).unwrap();

        t.ensure_ipc_dir().unwrap();

        assert!(root.path().join("nested").is_dir());
        assert!(!socket.exists());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Transport::parse("failover://tcp://localhost:61616").is_err());
        assert!(Transport::parse("tcp://localhost").is_err());
        assert!(Transport::parse("tcp://:80").is_err());
        assert!(Transport::parse("tcp://host:port").is_err());
        assert!(Transport::parse("ipc://").is_err());
        assert!(Transport::parse("ipc:///tmp/kesi/").is_err());
    }
}
