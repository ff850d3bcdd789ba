use actix_web::{get, web, HttpResponse, Responder};

use super::models::{AppState, BalanceResponse};

#[get("/balance/{address}/")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let address = path.into_inner().0;
    let balance = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.balance_of(&address)
    };
    HttpResponse::Ok().json(BalanceResponse { address, balance })
}
