use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::rpc::{DEFAULT_MAX_FRAME_BYTES, DEFAULT_OUTBOUND_QUEUE, TransportLimits};

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "jamrpc.toml";
/// Prefix for environment overrides, e.g. `JAMRPC_RPC_BIND`.
pub const ENV_PREFIX: &str = "JAMRPC_";

/// Which side of a session this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Client,
    Server,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: Mode,
    /// Loopback-only unless configured otherwise.
    pub rpc_bind: SocketAddr,
    pub max_frame_bytes: usize,
    pub outbound_queue: usize,
    pub verbose: bool,
    pub json_logs: bool,
    pub simulation: bool,

    pub client_name: String,
    pub server_name: String,
    pub server_city: String,
    pub welcome_message: String,
    pub recording_directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Client,
            rpc_bind: SocketAddr::from(([127, 0, 0, 1], 22123)),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            verbose: false,
            json_logs: false,
            simulation: false,
            client_name: String::new(),
            server_name: String::new(),
            server_city: String::new(),
            welcome_message: String::new(),
            recording_directory: PathBuf::new(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then the config file (`jamrpc.toml` unless a path is
    /// given), then `JAMRPC_*` variables, then any command-line overrides.
    pub fn load<T: Serialize>(
        config_file: Option<&Path>,
        overrides: Option<&T>,
    ) -> Result<Self, figment::Error> {
        let mut figment = Self::figment(config_file);
        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }
        figment.extract()
    }

    fn figment(config_file: Option<&Path>) -> Figment {
        let file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn transport_limits(&self) -> TransportLimits {
        TransportLimits {
            max_frame_bytes: self.max_frame_bytes,
            outbound_queue: self.outbound_queue,
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
