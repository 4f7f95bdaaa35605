//! Task Coordinator Client
//!
//! Drives the on-chain node/task coordination program: registers a node,
//! dispatches work and closes sessions, one confirmed transaction per step.
//!
//! ## Commands
//!
//! - `run` (default): the scripted six-step session from `[session]`
//! - `send <op>`: a single operation
//! - `check`: preflight only
//! - `encode` / `decode`: offline payload tools, no network access

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_coordinator_client::config::Config;
use task_coordinator_client::metrics::metrics;
use task_coordinator_client::preflight::perform_checks;
use task_coordinator_client::rpc_manager::{LedgerRpc, SolanaRpc};
use task_coordinator_client::session::{run_sequence, scripted_session};
use task_coordinator_client::signer::LocalSigner;
use task_coordinator_client::structured_logging::StructuredLogger;
use task_coordinator_client::tx_builder::{
    encode_with_policy, DispatchContext, Field, FieldSet, LengthPolicy, Opcode, Operation,
    TxDispatcher,
};
use task_coordinator_client::wallet::{WalletManager, KEYPAIR_ENV};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Override rpc.url
    #[arg(long, env = "TASK_CLIENT_RPC_URL")]
    rpc_url: Option<String>,

    /// Override wallet.keypair_path
    #[arg(long, env = "TASK_CLIENT_KEYPAIR_PATH")]
    keypair: Option<String>,

    /// Override program.program_id
    #[arg(long, env = "TASK_CLIENT_PROGRAM_ID")]
    program_id: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scripted session (register → … → end-session)
    Run,
    /// Run the preflight checks only
    Check,
    /// Dispatch a single operation
    Send {
        /// Operation name (e.g. dispatch-task) or opcode number
        operation: Opcode,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Print the hex payload for an opcode and fields
    Encode {
        /// Operation name or any u32 opcode
        #[arg(value_parser = parse_raw_opcode)]
        opcode: u32,
        #[command(flatten)]
        fields: FieldArgs,
        /// Skip the per-opcode field check
        #[arg(long)]
        raw: bool,
        /// Let oversized length prefixes wrap instead of failing
        #[arg(long)]
        wrap: bool,
    },
    /// Decode a hex payload using its opcode's field layout
    Decode {
        payload: String,
    },
}

#[derive(ClapArgs, Debug, Default)]
struct FieldArgs {
    #[arg(long)]
    node_id: Option<String>,
    #[arg(long)]
    task_id: Option<String>,
    #[arg(long)]
    ip_address: Option<String>,
    #[arg(long)]
    hardware_id: Option<String>,
    #[arg(long)]
    answer_data: Option<String>,
}

impl FieldArgs {
    fn to_field_set(&self) -> FieldSet {
        let mut set = FieldSet::new();
        set.set(Field::NodeId, self.node_id.clone());
        set.set(Field::TaskId, self.task_id.clone());
        set.set(Field::IpAddress, self.ip_address.clone());
        set.set(Field::HardwareId, self.hardware_id.clone());
        set.set(Field::AnswerData, self.answer_data.clone());
        set
    }
}

fn parse_raw_opcode(s: &str) -> Result<u32, String> {
    s.parse::<u32>()
        .or_else(|_| s.parse::<Opcode>().map(Opcode::as_u32))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let mut args = load_env_and_parse(None, std::env::args_os());

    // Load configuration
    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    init_logging(args.verbose, config.monitoring.json_logs)?;
    info!("Task coordinator client v{}", env!("CARGO_PKG_VERSION"));

    let command = args.command.take().unwrap_or(Command::Run);
    match &command {
        Command::Encode {
            opcode,
            fields,
            raw,
            wrap,
        } => encode_command(*opcode, fields, *raw, *wrap, args.json),
        Command::Decode { payload } => decode_command(payload, args.json),
        Command::Check | Command::Run | Command::Send { .. } => {
            network_command(&command, &config, args.json).await
        }
    }
}

/// Load `.env` (or `env_file`) first so env-backed flags see its values
fn load_env_and_parse<I, T>(env_file: Option<&Path>, argv: I) -> Args
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match env_file {
        Some(path) => dotenvy::from_path(path).ok(),
        None => dotenvy::dotenv().ok().map(|_| ()),
    };
    Args::try_parse_from(argv).unwrap_or_else(|e| e.exit())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_filter = if verbose {
        "task_coordinator_client=debug,info"
    } else {
        "task_coordinator_client=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        // Logging is not up yet
        eprintln!("Config file '{}' not found, using defaults", path);
        Ok(Config::default())
    }
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(url) = &args.rpc_url {
        config.rpc.url = url.clone();
    }
    if let Some(path) = &args.keypair {
        config.wallet.keypair_path = path.clone();
    }
    if let Some(program_id) = &args.program_id {
        config.program.program_id = Some(program_id.clone());
    }
}

fn encode_command(opcode: u32, fields: &FieldArgs, raw: bool, wrap: bool, json: bool) -> Result<()> {
    let fields = fields.to_field_set();
    if !raw {
        let known = Opcode::try_from(opcode)?;
        Operation::from_fields(known, &fields)?;
    }
    let policy = if wrap { LengthPolicy::Wrap } else { LengthPolicy::Strict };
    let payload = encode_with_policy(opcode, &fields, policy)?;

    if json {
        let out = serde_json::json!({
            "opcode": opcode,
            "fields": fields,
            "payload": hex::encode(&payload),
            "len": payload.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", hex::encode(&payload));
    }
    Ok(())
}

fn decode_command(payload: &str, json: bool) -> Result<()> {
    let bytes = hex::decode(payload.trim().trim_start_matches("0x")).context("Payload is not valid hex")?;
    let operation = Operation::decode(&bytes)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&operation)?);
    } else {
        println!("{}", operation);
        let fields = operation.fields();
        for field in fields.present() {
            println!("  {} = {}", field, fields.get(field).unwrap_or_default());
        }
    }
    Ok(())
}

async fn network_command(command: &Command, config: &Config, json: bool) -> Result<()> {
    let logger = StructuredLogger::new(config.rpc.cluster.clone());
    let rpc: Arc<dyn LedgerRpc> = Arc::new(SolanaRpc::from_config(&config.rpc)?);
    info!(endpoint = rpc.endpoint(), context_id = logger.context_id(), "Connecting");

    let keypair_env = std::env::var(KEYPAIR_ENV).ok();
    let wallet = WalletManager::discover(&config.wallet.keypair_path, keypair_env.as_deref())
        .context("Failed to load wallet")?;
    let program_id = config.program.pubkey()?;

    let report = perform_checks(
        rpc.as_ref(),
        wallet.as_ref().map(WalletManager::pubkey),
        program_id,
        config.preflight.minimum_balance_lamports,
        &logger,
    )
    .await?;

    if let Command::Check = command {
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        return Ok(());
    }

    // Preflight guarantees both are present
    let (Some(wallet), Some(program_id)) = (wallet, program_id) else {
        anyhow::bail!("Preflight passed without identity or program id");
    };

    let operations = match command {
        Command::Send { operation, fields } => {
            vec![Operation::from_fields(*operation, &fields.to_field_set())?]
        }
        _ => scripted_session(&config.session),
    };

    let signer = Arc::new(LocalSigner::new(wallet.keypair_arc()));
    let context = DispatchContext::capture(rpc, signer, program_id).await?;
    let dispatcher = TxDispatcher::new(Arc::new(context), logger);

    let result = run_sequence(&dispatcher, &operations).await;

    if config.monitoring.enable_metrics {
        match metrics().render() {
            Ok(text) => debug!(metrics = %text, "Run metrics"),
            Err(e) => warn!("Failed to render metrics: {}", e),
        }
    }

    match result {
        Ok(confirmations) => {
            info!(count = confirmations.len(), "All operations confirmed");
            if json {
                println!("{}", serde_json::to_string_pretty(&confirmations)?);
            }
            Ok(())
        }
        Err(err) => {
            error!(
                step = err.index(),
                completed = err.completed().len(),
                skipped = operations.len() - err.index() - 1,
                "Session halted: {}",
                err
            );
            if json {
                println!("{}", serde_json::to_string_pretty(err.completed())?);
            }
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_parse_send() {
        let args = Args::try_parse_from([
            "task-coordinator-client",
            "send",
            "dispatch-task",
            "--node-id",
            "123",
            "--task-id",
            "task_001",
        ])
        .unwrap();

        match args.command {
            Some(Command::Send { operation, fields }) => {
                assert_eq!(operation, Opcode::DispatchTask);
                let op = Operation::from_fields(operation, &fields.to_field_set()).unwrap();
                assert_eq!(
                    op,
                    Operation::DispatchTask {
                        node_id: "123".to_string(),
                        task_id: "task_001".to_string()
                    }
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_raw_opcode() {
        assert_eq!(parse_raw_opcode("17"), Ok(17));
        assert_eq!(parse_raw_opcode("return-answer"), Ok(3));
        assert!(parse_raw_opcode("teleport").is_err());
    }

    #[test]
    fn test_env_file_feeds_flags() {
        let program_id = "SysvarC1ock11111111111111111111111111111111";
        let mut env_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(env_file, "TASK_CLIENT_PROGRAM_ID={}", program_id).unwrap();

        let args = load_env_and_parse(Some(env_file.path()), ["task-coordinator-client", "check"]);
        assert_eq!(args.program_id.as_deref(), Some(program_id));
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "task-coordinator-client",
            "--rpc-url",
            "http://localhost:8899",
            "--program-id",
            "11111111111111111111111111111111",
            "check",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert!(config.program.pubkey().unwrap().is_some());
    }
}
