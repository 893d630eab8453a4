// src/main.rs
//
// facturacom - command line host for the CFDI invoicing workflow

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use facturacom_cfdi::application::commands::*;
use facturacom_cfdi::application::dto::{GenerateCfdiDto, TestConnectionDto};
use facturacom_cfdi::application::state::AppState;
use facturacom_cfdi::db::{
    create_connection_pool, get_connection, get_database_path, initialize_database,
};
use facturacom_cfdi::domain::Order;
use facturacom_cfdi::integrations::ReqwestTransport;

#[derive(Parser)]
#[command(name = "facturacom", version, about = "CFDI invoicing for store orders via Factura.com")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "FACTURACOM_DB", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an order (JSON file) so it can be invoiced
    ImportOrder { file: PathBuf },

    /// Issue the CFDI of an order
    Generate {
        order_id: i64,
        /// Cancel the active CFDI first and issue a new one
        #[arg(long)]
        regenerate: bool,
    },

    /// Cancel the active CFDI of an order
    Cancel { order_id: i64 },

    /// Show the invoice state of an order
    Status { order_id: i64 },

    /// Show the recorded invoicing events of an order
    History { order_id: i64 },

    /// Signal that an order reached "completed"
    OrderCompleted {
        order_id: i64,
        /// Return immediately instead of waiting for automatic generation
        #[arg(long)]
        no_wait: bool,
    },

    /// Check Factura.com credentials without saving them
    TestConnection {
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        api_secret: String,
        #[arg(long)]
        sandbox: bool,
    },

    /// Invoicing options
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Customer emails queued for delivery
    #[command(subcommand)]
    Emails(EmailCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    List,
    Set { name: String, value: String },
}

#[derive(Subcommand)]
enum EmailCommand {
    Pending,
    MarkSent { id: i64 },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints a command outcome; errors are already JSON
fn report<T: Serialize>(outcome: Result<T, String>) -> anyhow::Result<ExitCode> {
    match outcome {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("{}", error);
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // 1. INFRASTRUCTURE
    let db_path = match cli.db {
        Some(path) => path,
        None => get_database_path()?,
    };
    log::debug!("Using database {}", db_path.display());

    let pool = Arc::new(create_connection_pool(&db_path)?);
    {
        let conn = get_connection(&pool)?;
        initialize_database(&conn)?;
    }
    let transport = Arc::new(ReqwestTransport::new()?);

    // 2. APPLICATION STATE
    let state = AppState::new(pool, transport)?;

    // 3. DISPATCH
    match cli.command {
        Command::ImportOrder { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let order: Order = serde_json::from_str(&raw).context("Invalid order JSON")?;
            state.orders.insert(&order)?;
            log::info!("Imported order {}", order.id);
            print_json(&order)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate {
            order_id,
            regenerate,
        } => {
            let result = generate_cfdi(
                GenerateCfdiDto {
                    order_id,
                    regenerate,
                },
                &state,
            )
            .await;
            print_json(&result)?;
            Ok(exit_code(result.is_success()))
        }
        Command::Cancel { order_id } => {
            let result = cancel_cfdi(order_id, &state).await;
            print_json(&result)?;
            Ok(exit_code(result.is_success()))
        }
        Command::Status { order_id } => report(get_invoice_status(order_id, &state).await),
        Command::History { order_id } => report(get_invoice_history(order_id, &state).await),
        Command::OrderCompleted { order_id, no_wait } => {
            if no_wait {
                log::warn!("Not waiting: a scheduled generation ends with this process");
            }
            report(order_completed(order_id, !no_wait, &state).await)
        }
        Command::TestConnection {
            api_key,
            api_secret,
            sandbox,
        } => {
            let result = test_connection(
                TestConnectionDto {
                    api_key,
                    api_secret,
                    sandbox,
                },
                &state,
            )
            .await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        Command::Config(ConfigCommand::List) => report(list_settings(&state).await),
        Command::Config(ConfigCommand::Set { name, value }) => {
            report(update_setting(name, value, &state).await)
        }
        Command::Emails(EmailCommand::Pending) => report(list_pending_emails(&state).await),
        Command::Emails(EmailCommand::MarkSent { id }) => {
            report(mark_email_sent(id, &state).await)
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
