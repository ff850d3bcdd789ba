mod balance;
mod chain;
mod contracts;
mod health;
pub mod models;
mod panels;
mod telemetry;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

/// Register all routes under `/api/v1` (with trailing slash for each endpoint).
pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(balance::get_balance)
            .service(panels::register_panel)
            .service(panels::list_panels)
            .service(tx::post_transaction)
            .service(tx::get_pending)
            .service(telemetry::post_sample)
            .service(contracts::execute_contract)
            .service(chain::get_chain)
            .service(chain::validate_chain)
            .service(chain::get_stats)
            .service(chain::mine_block)
            .service(chain::save_snapshot)
            .service(wallet::create_wallet),
    );
}
