use actix_web::{post, HttpResponse, Responder};
use serde::Serialize;

use crate::wallet::Keypair;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewWalletResponse {
    private_key: String,
    public_key: String,
    address: String,
}

/// Mint an account keypair for signing transfers. The private key is
/// returned once and never stored server-side.
#[post("/wallets/")]
pub async fn create_wallet() -> impl Responder {
    let keys = Keypair::generate();
    let address = keys.address().to_string();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key: keys.private_key,
        public_key: keys.public_key,
        address,
    })
}
