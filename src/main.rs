use clap::Parser;
use std::path::PathBuf;

use entry_registry::config::AppConfig;
use entry_registry::entries::MyEntry;
use entry_registry::lifecycle::{AppContext, BootCoordinator, Entry, EntryContext};
use entry_registry::{capability, entries};

#[derive(Parser)]
#[command(name = "entry-registry")]
#[command(about = "Register entries from a boot config and drive their lifecycle")]
struct Cli {
    /// Boot config file (YAML or JSON).
    #[arg(long, env = "BOOT_CONFIG", default_value = "boot.yaml")]
    config: PathBuf,

    /// Name of the entry to bootstrap.
    #[arg(long, env = "BOOT_ENTRY", default_value = "my-entry")]
    entry: String,

    /// Bootstrap every registered entry instead of only `--entry`.
    #[arg(long)]
    all: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Print the registry snapshot as JSON after bootstrap.
    #[arg(long)]
    dump: bool,

    /// Interrupt and exit right after bootstrap instead of waiting for a signal.
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig {
        config_path: cli.config,
        entry_name: cli.entry,
        log_level: cli.log_level,
    };

    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_writer(std::io::stderr)
        .init();

    let ctx = AppContext::global();
    capability::install(&ctx);
    entries::install(&ctx);

    let coordinator = BootCoordinator::new(ctx.clone());

    if let Err(e) = coordinator.register_all(&config.config_path).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let ectx = EntryContext::new().with_trace_id(format!(
        "boot-{}",
        chrono::Utc::now().timestamp_millis()
    ));

    if cli.all {
        coordinator.bootstrap_all(&ectx).await?;
    } else {
        let entry = ctx.get_entry_as::<MyEntry>(&config.entry_name)?;
        coordinator.bootstrap(entry.name(), &ectx).await?;
        entry
            .zap_logger_entry()
            .info(&format!("Entry {} bootstrapped", entry.name()));
    }

    if cli.dump {
        println!("{}", serde_json::to_string_pretty(&ctx.snapshot()?)?);
    }

    if !cli.no_wait {
        tracing::info!("Entries running, waiting for signals...");

        #[cfg(unix)]
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        let shutdown_reason: &str;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                shutdown_reason = "sigint";
            },
            _ = async {
                #[cfg(unix)]
                {
                    terminate.recv().await;
                }
                #[cfg(not(unix))]
                {
                    std::future::pending::<()>().await;
                }
            } => {
                shutdown_reason = "sigterm";
            }
        }
        tracing::info!(reason = shutdown_reason, "Initiating graceful shutdown...");
    }

    let interrupted = coordinator.interrupt_all(&ectx).await;
    tracing::info!(count = interrupted.len(), "Shutdown complete");
    Ok(())
}
