use crate::chain::{AddressError, ChainContext, Connector, DEFAULT_POLL_INTERVAL};
use alloy::signers::local::{LocalSignerError, PrivateKeySigner};
use clap::{Parser, ValueHint};
use serde::Deserialize;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Command-line interface. Every flag can also come from the environment.
#[derive(Debug, Default, Parser)]
#[command(name = "todos-tui", version, about = "Create, update and delete on-chain todos")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, env = "TODOS_TUI_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// JSON-RPC endpoint of the chain the contract lives on
    #[arg(long, env = "TODOS_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Address of the deployed Todos contract
    #[arg(long = "contract", env = "TODOS_CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// Hex private key offered as the "Private Key" connector
    #[arg(long, env = "TODOS_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Interval between event filter polls, in milliseconds
    #[arg(long, env = "TODOS_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<u64>,

    /// Where to write logs (the terminal is owned by the UI)
    #[arg(long, env = "TODOS_TUI_LOG", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,
}

/// Keys accepted in the configuration file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub contract_address: Option<String>,
    pub private_key: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl FromStr for FileConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    MissingContract,
    ContractAddress(AddressError),
    PrivateKey(LocalSignerError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config file at {}: {source}", path.display())
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse config file at {}: {source}", path.display())
            }
            ConfigError::MissingContract => f.write_str(
                "no contract address configured (use --contract or TODOS_CONTRACT_ADDRESS)",
            ),
            ConfigError::ContractAddress(err) => write!(f, "invalid contract address: {err}"),
            ConfigError::PrivateKey(err) => write!(f, "invalid private key: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::ContractAddress(err) => Some(err),
            ConfigError::PrivateKey(err) => Some(err),
            ConfigError::MissingContract => None,
        }
    }
}

impl From<AddressError> for ConfigError {
    fn from(value: AddressError) -> Self {
        ConfigError::ContractAddress(value)
    }
}

impl From<LocalSignerError> for ConfigError {
    fn from(value: LocalSignerError) -> Self {
        ConfigError::PrivateKey(value)
    }
}

/// Settings after merging flags, environment and the optional file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub private_key: Option<String>,
    pub poll_interval: Duration,
    pub log_file: PathBuf,
}

impl AppConfig {
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match cli.config.as_deref() {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    /// Flags and environment win over the file, the file wins over defaults.
    pub fn merge(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let contract_address = cli
            .contract_address
            .or(file.contract_address)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingContract)?;
        let poll_interval = cli
            .poll_interval_ms
            .or(file.poll_interval_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);
        Ok(Self {
            rpc_url: cli
                .rpc_url
                .or(file.rpc_url)
                .unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            contract_address,
            private_key: cli
                .private_key
                .or(file.private_key)
                .filter(|value| !value.trim().is_empty()),
            poll_interval,
            log_file: cli
                .log_file
                .or(file.log_file)
                .unwrap_or_else(crate::logging::default_log_file),
        })
    }

    /// Resolves the contract address. Fails on anything that is not a valid
    /// address, which stops startup before the terminal is touched.
    pub fn chain_context(&self) -> Result<ChainContext, ConfigError> {
        Ok(ChainContext::new(
            self.rpc_url.clone(),
            &self.contract_address,
            self.poll_interval,
        )?)
    }

    pub fn connectors(&self) -> Result<Vec<Connector>, ConfigError> {
        let mut connectors = Vec::new();
        if let Some(key) = &self.private_key {
            let signer = PrivateKeySigner::from_str(key.trim())?;
            connectors.push(Connector::local_key(signer));
        }
        connectors.push(Connector::node_accounts());
        Ok(connectors)
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    content.parse().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn cli_with_contract() -> Cli {
        Cli {
            contract_address: Some(CONTRACT.into()),
            log_file: Some(PathBuf::from("todos.log")),
            ..Cli::default()
        }
    }

    #[test]
    fn defaults_apply_when_only_contract_is_given() {
        let config = AppConfig::merge(cli_with_contract(), FileConfig::default()).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(config.private_key.is_none());
    }

    #[test]
    fn flags_override_file_values() {
        let file = FileConfig {
            rpc_url: Some("http://file:8545".into()),
            contract_address: Some("0x0000000000000000000000000000000000000001".into()),
            poll_interval_ms: Some(500),
            ..FileConfig::default()
        };
        let cli = Cli {
            rpc_url: Some("http://flag:8545".into()),
            ..cli_with_contract()
        };

        let config = AppConfig::merge(cli, file).unwrap();

        assert_eq!(config.rpc_url, "http://flag:8545");
        assert_eq!(config.contract_address, CONTRACT);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn missing_contract_is_an_error() {
        let err = AppConfig::merge(Cli::default(), FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingContract));
    }

    #[test]
    fn loads_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "rpc_url = \"http://anvil:8545\"\ncontract_address = \"{CONTRACT}\"\npoll_interval_ms = 250"
        )
        .unwrap();
        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            log_file: Some(PathBuf::from("todos.log")),
            ..Cli::default()
        };

        let config = AppConfig::load(cli).unwrap();

        assert_eq!(config.rpc_url, "http://anvil:8545");
        assert_eq!(config.contract_address, CONTRACT);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        assert!("contract = \"0x00\"".parse::<FileConfig>().is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..cli_with_contract()
        };
        let err = AppConfig::load(cli).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn invalid_contract_fails_resolution() {
        let cli = Cli {
            contract_address: Some("deployedContractAddress".into()),
            ..cli_with_contract()
        };
        let config = AppConfig::merge(cli, FileConfig::default()).unwrap();
        assert!(matches!(
            config.chain_context(),
            Err(ConfigError::ContractAddress(AddressError::MissingPrefix(_)))
        ));
    }

    #[test]
    fn private_key_adds_local_connector_first() {
        let cli = Cli {
            private_key: Some(ANVIL_KEY.into()),
            ..cli_with_contract()
        };
        let config = AppConfig::merge(cli, FileConfig::default()).unwrap();

        let connectors = config.connectors().unwrap();

        let names: Vec<&str> = connectors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Private Key", "Node Accounts"]);
    }

    #[test]
    fn bad_private_key_is_reported() {
        let cli = Cli {
            private_key: Some("0x1234".into()),
            ..cli_with_contract()
        };
        let config = AppConfig::merge(cli, FileConfig::default()).unwrap();
        assert!(matches!(
            config.connectors(),
            Err(ConfigError::PrivateKey(_))
        ));
    }
}
