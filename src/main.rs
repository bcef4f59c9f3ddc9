use fhe_mailbox::config::chains::ChainConfig;
use fhe_mailbox::engine::MailEngine;
use fhe_mailbox::runtime::{parse_command, Command};
use fhe_mailbox::utils::config::EngineConfig;
use serde_json::json;
use tokio_util::sync::CancellationToken;

async fn run(
    engine: &MailEngine,
    command: Command,
    cancel: &CancellationToken,
) -> anyhow::Result<serde_json::Value> {
    let value = match command {
        Command::Inbox { address, use_mock } => {
            let mails = engine
                .get_inbox_cancellable(address, use_mock, cancel)
                .await?;
            json!({ "count": mails.len(), "mock": use_mock, "mails": mails })
        }
        Command::Sent { address, use_mock } => {
            let view = engine.get_sent_cancellable(address, use_mock, cancel).await?;
            json!({
                "count": view.records.len(),
                "mock": view.mock,
                "mockFallbackUsed": view.mock_fallback_used,
                "mails": view.records,
            })
        }
        Command::Message { id, use_mock } => {
            let mail = engine
                .get_message_by_id_cancellable(id, use_mock, cancel)
                .await?;
            json!({ "found": mail.is_some(), "mail": mail })
        }
        Command::ByTx { tx_hash } => {
            let mail = engine.get_message_by_tx_hash(tx_hash).await?;
            json!({ "found": mail.is_some(), "mail": mail })
        }
        Command::Check => serde_json::to_value(engine.check_connection().await?)?,
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_report = fhe_mailbox::utils::env_guard::harden_env_setup();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        eprintln!("[STARTUP] RUST_LOG invalid or unset; defaulting to 'info'");
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    env_report.emit();

    let command = parse_command()?;
    let config = EngineConfig::from_env()?;
    let chain = ChainConfig::get(config.chain_id);
    tracing::info!(
        "[STARTUP] {} (chain={}) network={} window={} blocks (~{}s) chunk={} start={:?}",
        chain.name,
        chain.chain_id,
        config.network,
        config.scan.lookback_window,
        chain.approx_span_secs(config.scan.lookback_window),
        config.scan.chunk_size,
        config.scan.start_block
    );
    let engine = MailEngine::connect(&config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("[STARTUP] interrupt received, cancelling scan");
            ctrl_c.cancel();
        }
    });

    let output = run(&engine, command, &cancel).await.map_err(|err| {
        tracing::error!("[STARTUP] {} failed: {err:#}", command.as_str());
        err
    })?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
