use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::registry::{HostPort, Registry, VoiceAddress};
use crate::voice::DEFAULT_QUERY_PORT;

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceServerConfig {
    pub label: String,
    /// `host:virtual_server_id`
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rcon_password: String,
    /// Substring counted in raw player names for the clan annotation.
    pub clan_tag: String,
    /// Chat command prefixes; only the transport cares about these.
    pub prefixes: Vec<String>,
    pub owners: Vec<String>,
    pub voice_query_port: u16,
    /// RCON command whose output is delivered privately.
    pub dump_command: String,
    pub timeout_secs: u64,
    /// Server list, relative to the config file.
    pub servers_file: PathBuf,
    pub voice_servers: Vec<VoiceServerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rcon_password: String::new(),
            clan_tag: String::new(),
            prefixes: vec![".".to_owned(), "!".to_owned()],
            owners: Vec::new(),
            voice_query_port: DEFAULT_QUERY_PORT,
            dump_command: "dumpuser".to_owned(),
            timeout_secs: 3,
            servers_file: PathBuf::from("servers.txt"),
            voice_servers: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_json::from_str(text)?;
        config.apply_env();
        Ok(config)
    }

    /// Read the JSON config at `path` and then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let mut config = Self::from_json(&text)?;
        if config.servers_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.servers_file = dir.join(&config.servers_file);
            }
        }
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(password) = env::var("RQ3_RCON_PASSWORD") {
            self.rcon_password = password;
        }
        if let Some(secs) = env::var("RQ3_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_secs = secs;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn load_servers(&self) -> Result<Registry<HostPort>, ConfigError> {
        let registry = Registry::parse_list(&read(&self.servers_file)?)?;
        info!(
            "loaded {} servers from {}",
            registry.len(),
            self.servers_file.display()
        );
        Ok(registry)
    }

    pub fn voice_registry(&self) -> Result<Registry<VoiceAddress>, ConfigError> {
        self.voice_servers
            .iter()
            .map(|v| -> Result<(String, VoiceAddress), ConfigError> {
                Ok((v.label.clone(), v.address.parse()?))
            })
            .collect()
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}
