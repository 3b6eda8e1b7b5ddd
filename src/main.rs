use std::sync::Arc;

use bcs_trade::auth::CredentialStore;
use bcs_trade::cli::{parse_args, version_line, CliCommand, USAGE};
use bcs_trade::config::ClientConfig;
use bcs_trade::events::callback;
use bcs_trade::rest::ApiResponse;
use bcs_trade::session::BcsSession;
use bcs_trade::subscriptions::{Channel, Instrument, SubscribeType};
use bcs_trade::traits::SecretStore;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bcs_trade=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "keyring-store")]
fn secret_store() -> Result<Arc<dyn SecretStore>> {
    Ok(Arc::new(bcs_trade::adapters::KeyringSecretStore::new()))
}

#[cfg(not(feature = "keyring-store"))]
fn secret_store() -> Result<Arc<dyn SecretStore>> {
    let store = bcs_trade::adapters::FileSecretStore::new().wrap_err("Cannot locate the secrets file")?;
    Ok(Arc::new(store))
}

fn print_response(response: Option<ApiResponse>) -> Result<()> {
    match response {
        Some(ApiResponse::Json(value)) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Some(ApiResponse::Text(text)) => {
            println!("{}", text);
            Ok(())
        }
        None => Err(eyre!("Request failed, see the log for details")),
    }
}

async fn watch(session: &BcsSession, class_code: String, ticker: String, time_frame: String) -> Result<()> {
    let subscriptions = session.subscriptions();
    subscriptions
        .events(Channel::LastCandle)
        .subscribe(callback(|frame: &Value| {
            println!("{}", frame);
            Ok(())
        }));

    let instruments = vec![Instrument::new(class_code, ticker)];
    subscriptions
        .subscribe_last_candles(SubscribeType::Subscribe, instruments, &time_frame)
        .await?;
    info!("Watching last candles, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    session.close().await;
    Ok(())
}

async fn run(command: CliCommand) -> Result<()> {
    let config = ClientConfig::from_env();
    let store = secret_store()?;

    match command {
        CliCommand::Logout => {
            let removed = CredentialStore::from_config(store, &config).clear()?;
            println!("Removed stored refresh secret ({} chunks)", removed);
        }
        CliCommand::Login { secret } => {
            let session = BcsSession::open(config, Some(secret), store)?;
            session.tokens().access_token().await?;
            println!("Refresh secret stored and accepted");
        }
        CliCommand::Token => {
            let session = BcsSession::open(config, None, store)?;
            session.tokens().access_token().await?;
            let expiry = session
                .tokens()
                .cached_expiry()
                .await
                .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "now".to_string());
            println!("Access token issued, valid until {}", expiry);
        }
        CliCommand::Limits => {
            let session = BcsSession::open(config, None, store)?;
            print_response(session.rest().get_limits().await)?;
        }
        CliCommand::Portfolio => {
            let session = BcsSession::open(config, None, store)?;
            print_response(session.rest().get_portfolio().await)?;
        }
        CliCommand::Watch {
            class_code,
            ticker,
            time_frame,
        } => {
            let session = BcsSession::open(config, None, store)?;
            watch(&session, class_code, ticker, time_frame).await?;
        }
        CliCommand::Version | CliCommand::Help | CliCommand::Invalid(_) => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = parse_args(std::env::args());
    match command {
        CliCommand::Version => {
            println!("{}", version_line());
            return Ok(());
        }
        CliCommand::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        CliCommand::Invalid(reason) => {
            eprintln!("Error: {}\n\n{}", reason, USAGE);
            std::process::exit(2);
        }
        _ => {}
    }

    color_eyre::install()?;
    init_logging();
    run(command).await
}
