//! DocChain command line: serve the reference registry, or act as a client
//! against one.

use anyhow::Context;
use clap::Parser;
use docchain_client::{ClientConfig, LedgerConfig, Session, SessionError};
use docchain_registration::{
    MinedCheckpoint, RegistrationError, RegistrationOutcome, RegistrationState,
};
use docchain_server::{RegistryServer, ServerConfig};
use docchain_types::{DocumentId, TxHash};
use docchain_utils::{format_elapsed, init_logging, LogFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "docchain", about = "Document integrity registration and verification")]
struct Cli {
    /// Path to a client TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, global = true, env = "DOCCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Registry base URL.
    #[arg(long, global = true, env = "DOCCHAIN_BACKEND_URL")]
    backend_url: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, global = true, env = "DOCCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "DOCCHAIN_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the reference registry.
    Serve {
        /// Path to a server TOML configuration file.
        #[arg(long, env = "DOCCHAIN_SERVER_CONFIG")]
        server_config: Option<PathBuf>,

        #[arg(long, env = "DOCCHAIN_HOST")]
        host: Option<String>,

        #[arg(long, env = "DOCCHAIN_PORT")]
        port: Option<u16>,

        /// Registry contract address advertised to clients.
        #[arg(long, env = "DOCCHAIN_CONTRACT_ADDRESS")]
        contract_address: Option<String>,

        /// JSON file holding the contract ABI.
        #[arg(long, env = "DOCCHAIN_CONTRACT_ABI")]
        contract_abi: Option<PathBuf>,
    },

    /// Print a file's fingerprint.
    Hash { path: PathBuf },

    /// Register a file with the registry and, if a ledger node is
    /// configured, anchor it on chain.
    Register {
        path: PathBuf,

        #[arg(long, env = "DOCCHAIN_OWNER")]
        owner: Option<String>,

        /// Ledger JSON-RPC endpoint.
        #[arg(long, env = "DOCCHAIN_RPC_URL")]
        rpc_url: Option<String>,

        /// Sending account.
        #[arg(long, env = "DOCCHAIN_FROM")]
        from: Option<String>,
    },

    /// Check a file against the registry.
    Verify {
        path: PathBuf,

        /// Document the file claims to be.
        #[arg(long)]
        document_id: Option<String>,
    },

    /// Record an already mined transaction for a staged document.
    Confirm {
        document_id: String,

        tx_hash: String,

        #[arg(long)]
        block_number: Option<u64>,
    },

    /// List registered documents.
    Documents,

    /// Show the registry's audit history.
    History,

    /// Show registry counters.
    Stats,

    /// Check that the registry is up.
    Health,
}

fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_toml_file(&path.display().to_string())?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = client_config(&cli)?;
    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Serve {
            server_config,
            host,
            port,
            contract_address,
            contract_abi,
        } => {
            let mut server = match server_config {
                Some(path) => ServerConfig::from_toml_file(&path.display().to_string())?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }
            if contract_address.is_some() {
                server.contract_address = contract_address;
            }
            if contract_abi.is_some() {
                server.contract_abi_path = contract_abi;
            }

            tracing::info!(
                "starting registry on {}:{} ({})",
                server.host,
                server.port,
                server.network
            );
            let registry = RegistryServer::new(server)?;
            tokio::select! {
                result = registry.start() => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received, stopping registry");
                }
            }
        }

        Command::Hash { path } => {
            let hash = docchain_crypto::fingerprint_file(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            println!("{hash}  {}", path.display());
        }

        Command::Register {
            path,
            owner,
            rpc_url,
            from,
        } => {
            if let Some(url) = rpc_url {
                let ledger = config
                    .ledger
                    .get_or_insert_with(|| LedgerConfig::new(url.clone()));
                ledger.rpc_url = url;
            }
            if let (Some(ledger), Some(from)) = (config.ledger.as_mut(), from) {
                ledger.from = Some(from);
            }

            let session = Session::from_config(config)?;
            session.select_file(&path)?;

            let mut progress = session.subscribe();
            let watcher = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let state = progress.borrow_and_update().clone();
                    if let RegistrationState::Submitted { tx_hash, .. } = &state {
                        tracing::info!(%tx_hash, "transaction submitted, waiting for receipt");
                    } else {
                        tracing::info!(state = state.label(), "registration progress");
                    }
                }
            });

            let started = Instant::now();
            let result = session.register(owner.as_deref()).await;
            watcher.abort();
            let elapsed = format_elapsed(started.elapsed());

            match result {
                Ok(RegistrationOutcome::Confirmed {
                    staged,
                    confirmation,
                }) => {
                    println!(
                        "registered {} as {} in tx {} ({elapsed})",
                        staged.file_name, confirmation.document_id, confirmation.tx_hash
                    );
                }
                Ok(RegistrationOutcome::Staged(staged)) => {
                    println!(
                        "staged {} as {}; no ledger configured, nothing anchored",
                        staged.file_name, staged.document_id
                    );
                }
                Err(SessionError::Registration(RegistrationError::ConfirmFailed {
                    checkpoint,
                    reason,
                })) => {
                    eprintln!(
                        "transaction {} is mined but the registry was not updated: {reason}\n\
                         retry with: docchain confirm {} {}{}",
                        checkpoint.tx_hash,
                        checkpoint.document_id,
                        checkpoint.tx_hash,
                        checkpoint
                            .block_number
                            .map(|b| format!(" --block-number {b}"))
                            .unwrap_or_default()
                    );
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Verify { path, document_id } => {
            let session = Session::from_config(config)?;
            session.select_file(&path)?;
            let outcome = session.verify(document_id.as_deref()).await?;
            println!("{outcome}");
            if !outcome.is_verified() {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Confirm {
            document_id,
            tx_hash,
            block_number,
        } => {
            let session = Session::from_config(config)?;
            let checkpoint = MinedCheckpoint {
                document_id: DocumentId::parse(&document_id)?,
                tx_hash: TxHash::new(tx_hash),
                block_number,
            };
            let confirmed = session.confirm(&checkpoint).await?;
            println!(
                "confirmed {} in tx {}",
                confirmed.document_id, confirmed.tx_hash
            );
        }

        Command::Documents => {
            let session = Session::from_config(config)?;
            print_json(&session.documents().await?)?;
        }

        Command::History => {
            let session = Session::from_config(config)?;
            print_json(&session.history().await?)?;
        }

        Command::Stats => {
            let session = Session::from_config(config)?;
            print_json(&session.stats().await?)?;
        }

        Command::Health => {
            let session = Session::from_config(config)?;
            print_json(&session.health().await?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
