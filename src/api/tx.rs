use actix_web::{get, post, web, HttpResponse, Responder};
use log::{debug, warn};

use super::models::{error_response, AppState, NewTransactionRequest, NewTransactionResponse};

/// Submit a transfer into the pending pool.
#[post("/transactions/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTransactionRequest>,
) -> impl Responder {
    let req = body.into_inner();
    debug!(
        "POST /transactions/ - {} -> {} amount {}",
        req.sender, req.receiver, req.amount
    );

    let created = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.create_transfer(
            &req.sender,
            &req.receiver,
            req.amount,
            req.panel_id,
            req.signature,
        )
    };

    match created {
        Ok(txid) => {
            debug!("POST /transactions/ - accepted {txid}");
            HttpResponse::Ok().json(NewTransactionResponse { txid })
        }
        Err(e) => {
            warn!("POST /transactions/ - rejected: {e}");
            error_response(&e)
        }
    }
}

/// List the pending pool (transactions only; samples have no ids).
#[get("/pending/")]
pub async fn get_pending(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let txids: Vec<String> = ledger
        .pending_transactions()
        .iter()
        .map(|t| t.txid.clone())
        .collect();
    HttpResponse::Ok().json(serde_json::json!({
        "transactions": txids,
        "samples": ledger.pending_samples().len(),
    }))
}
