//! Configuration module for the task coordinator client
//!
//! Configuration is loaded from a TOML file and then overridden by command
//! line flags / environment variables (including a `.env` file) in `main`.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::path::Path;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Deployed program
    #[serde(default)]
    pub program: ProgramConfig,

    /// Environment checks run before any dispatch
    #[serde(default)]
    pub preflight: PreflightConfig,

    /// Field values used by the scripted session
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging and metrics
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment level: processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Delay between signature status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Cluster name used in explorer links
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Base58 program id; absent until the program has been deployed
    #[serde(default)]
    pub program_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightConfig {
    /// Balance below which a funding hint is logged (lamports)
    #[serde(default = "default_minimum_balance")]
    pub minimum_balance_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default = "default_task_id")]
    pub task_id: String,
    #[serde(default = "default_ip_address")]
    pub ip_address: String,
    #[serde(default = "default_hardware_id")]
    pub hardware_id: String,
    #[serde(default = "default_answer_data")]
    pub answer_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Log the Prometheus exposition at the end of a run
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Emit JSON formatted logs
    #[serde(default)]
    pub json_logs: bool,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_poll_interval() -> u64 { 500 }
fn default_cluster() -> String { "devnet".to_string() }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_minimum_balance() -> u64 { 1_000_000_000 }
fn default_node_id() -> String { "123".to_string() }
fn default_task_id() -> String { "task_001".to_string() }
fn default_ip_address() -> String { "192.168.1.1".to_string() }
fn default_hardware_id() -> String { "hw_001".to_string() }
fn default_answer_data() -> String { "answer_data".to_string() }
fn default_true() -> bool { true }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
            poll_interval_ms: default_poll_interval(),
            cluster: default_cluster(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            minimum_balance_lamports: default_minimum_balance(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            task_id: default_task_id(),
            ip_address: default_ip_address(),
            hardware_id: default_hardware_id(),
            answer_data: default_answer_data(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
            json_logs: false,
        }
    }
}

impl RpcConfig {
    pub fn commitment_config(&self) -> anyhow::Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => bail!("Unknown commitment level '{}'", other),
        }
    }
}

impl ProgramConfig {
    /// Parsed program id, `None` when not configured
    pub fn pubkey(&self) -> anyhow::Result<Option<Pubkey>> {
        self.program_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Pubkey::from_str(s).with_context(|| format!("Invalid program id '{}'", s)))
            .transpose()
    }
}

impl SessionConfig {
    /// Every scripted operation needs its fields present on the wire
    fn validate(&self) -> anyhow::Result<()> {
        let values = [
            ("node_id", &self.node_id),
            ("task_id", &self.task_id),
            ("ip_address", &self.ip_address),
            ("hardware_id", &self.hardware_id),
            ("answer_data", &self.answer_data),
        ];
        for (name, value) in values {
            if value.is_empty() {
                bail!("session.{} must not be empty", name);
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            bail!("rpc.url must not be empty");
        }
        if self.rpc.timeout_secs == 0 {
            bail!("rpc.timeout_secs must be greater than zero");
        }
        if self.rpc.poll_interval_ms == 0 {
            bail!("rpc.poll_interval_ms must be greater than zero");
        }
        self.rpc.commitment_config()?;
        self.program.pubkey()?;
        self.session.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc.url, "https://api.devnet.solana.com");
        assert_eq!(config.preflight.minimum_balance_lamports, 1_000_000_000);
        assert_eq!(config.session.ip_address, "192.168.1.1");
        assert!(config.program.program_id.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial() {
        let program_id = Pubkey::new_unique();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[rpc]
url = "http://localhost:8899"
commitment = "finalized"

[program]
program_id = "{}"

[session]
node_id = "node-7"
"#,
            program_id
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.rpc.commitment_config().unwrap(), CommitmentConfig::finalized());
        assert_eq!(config.program.pubkey().unwrap(), Some(program_id));
        assert_eq!(config.session.node_id, "node-7");
        assert_eq!(config.session.task_id, "task_001");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.rpc.commitment = "eventually".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rpc.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.program.program_id = Some("not-a-pubkey".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_session_value() {
        let mut config = Config::default();
        config.session.ip_address = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.ip_address"));
    }

    #[test]
    fn test_blank_program_id_is_absent() {
        let program = ProgramConfig {
            program_id: Some("  ".to_string()),
        };
        assert_eq!(program.pubkey().unwrap(), None);
    }
}
