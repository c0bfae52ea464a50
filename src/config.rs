use crate::error::{AdbError, Result};
use log::debug;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Port the ADB server listens on.
pub const ADB_SERVER_PORT: u16 = 5037;
/// Port adbd listens on once a device is switched to TCP mode.
pub const ADB_DAEMON_PORT: u16 = 5555;
/// Per-read deadline applied to every blocking read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

const CONFIG_FILE_NAME: &str = ".adbwire.toml";

/// Connection settings threaded through every transport at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "read_timeout_secs", deserialize_with = "deserialize_secs")]
    pub read_timeout: Duration,
    /// Log every frame sent and received at `trace` level.
    pub trace_wire: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: ADB_SERVER_PORT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            trace_wire: false,
        }
    }
}

impl ClientConfig {
    /// Load `~/.adbwire.toml`, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                debug!("No home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file found");
                return Ok(Self::default());
            }
            Err(e) => return Err(AdbError::Config(format!("{}: {}", path.display(), e))),
        };

        let config: Self = toml::from_str(&content)
            .map_err(|e| AdbError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Parsed config: {:?}", config);
        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_trace_wire(mut self, trace_wire: bool) -> Self {
        self.trace_wire = trace_wire;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn address(&self) -> String {
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            &self.host
        };
        format!("{}:{}", host, self.port)
    }
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(serde::de::Error::custom(
            "read_timeout_secs must be a positive number",
        ));
    }
    Ok(Duration::from_secs_f64(secs))
}
