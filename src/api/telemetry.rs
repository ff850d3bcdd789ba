use actix_web::{post, web, HttpResponse, Responder};
use log::{debug, warn};

use super::models::{error_response, AppState};
use crate::telemetry::InverterSample;

/// Ingest a signed inverter reading into the pending pool.
#[post("/samples/")]
pub async fn post_sample(
    state: web::Data<AppState>,
    body: web::Json<InverterSample>,
) -> impl Responder {
    let sample = body.into_inner();
    let inverter = sample.inverter_id.clone();

    let accepted = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.submit_sample(sample)
    };

    match accepted {
        Ok(()) => {
            debug!("POST /samples/ - accepted reading from {inverter}");
            HttpResponse::Ok().json(serde_json::json!({ "accepted": true }))
        }
        Err(e) => {
            warn!("POST /samples/ - rejected reading from {inverter}: {e}");
            error_response(&e)
        }
    }
}
