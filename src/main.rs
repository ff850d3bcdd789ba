use std::env;
use std::process::ExitCode;

use actix_web::{web, App, HttpServer};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use log::{info, warn};

use carbonchain::api::{self, AppState};
use carbonchain::chain::Ledger;
use carbonchain::cli;
use carbonchain::contract::ContractEngine;
use carbonchain::storage::SnapshotStore;

#[derive(Parser)]
#[command(name = "carbonchain")]
#[command(about = "Carbon-aware blockchain for perovskite PV panels")]
struct Cli {
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the REST API server (default)
    Serve,
    /// Run the interactive console
    Console,
}

/// Load the snapshot if one exists, otherwise start from genesis.
fn bootstrap_ledger(store: &SnapshotStore) -> Ledger {
    match store.load() {
        Ok(Some(ledger)) => ledger,
        Ok(None) => {
            info!("no snapshot found, starting from genesis");
            Ledger::new()
        }
        Err(e) => {
            // a bad snapshot must not silently become an empty chain
            warn!("snapshot rejected ({e}); starting from genesis");
            Ledger::new()
        }
    }
}

#[actix_web::main]
async fn main() -> ExitCode {
    let _ = dotenv();
    env_logger::init();

    let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let store = SnapshotStore::new(data_dir);

    match Cli::parse().cmd.unwrap_or(Command::Serve) {
        Command::Console => {
            let mut ledger = bootstrap_ledger(&store);
            let contracts = ContractEngine::new();
            let code = cli::run(&mut ledger, &contracts, &store);
            ExitCode::from(code as u8)
        }
        Command::Serve => {
            let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port: u16 = env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080);

            println!("⛓️ Starting carbonchain API at http://{host}:{port}");

            let state = web::Data::new(AppState::new(bootstrap_ledger(&store), store));

            let server = HttpServer::new(move || {
                App::new()
                    .app_data(state.clone())
                    .configure(api::init_routes)
            })
            .bind((host.as_str(), port));

            match server {
                Ok(server) => match server.run().await {
                    Ok(()) => ExitCode::SUCCESS,
                    Err(e) => {
                        eprintln!("server failed: {e}");
                        ExitCode::from(2)
                    }
                },
                Err(e) => {
                    eprintln!("cannot bind {host}:{port}: {e}");
                    ExitCode::from(2)
                }
            }
        }
    }
}
