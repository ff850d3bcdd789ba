use std::sync::Mutex;

use actix_web::HttpResponse;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::{Block, Ledger};
use crate::contract::ContractEngine;
use crate::error::ChainError;
use crate::storage::SnapshotStore;

/// Shared application state: the ledger behind a mutex (single-writer
/// authority), the contract registry and the snapshot location.
pub struct AppState {
    pub ledger: Mutex<Ledger>,
    pub contracts: ContractEngine,
    pub store: SnapshotStore,
}

impl AppState {
    pub fn new(ledger: Ledger, store: SnapshotStore) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            contracts: ContractEngine::new(),
            store,
        }
    }
}

/// Map core errors onto HTTP statuses: caller mistakes are 400s, lost
/// mining races 409, unknown names 404, the rest 500.
pub fn error_response(err: &ChainError) -> HttpResponse {
    let body = err.to_string();
    match err {
        ChainError::StaleTip => HttpResponse::Conflict().body(body),
        ChainError::UnknownContract(_) | ChainError::PanelUnknown(_) => {
            HttpResponse::NotFound().body(body)
        }
        e if e.is_user_error() => HttpResponse::BadRequest().body(body),
        _ => HttpResponse::InternalServerError().body(body),
    }
}

/* ---------- Response/Request Models ---------- */

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPanelRequest {
    pub panel_id: String,
    pub production_date: NaiveDate,
    pub nominal_efficiency_pct: f64,
    pub size_m2: f64,
    pub manufacturer: String,
    pub manufacturing_footprint_kgco2: f64,
    pub lifetime_years: u32,
    pub carbon_reduction_factor: f64,
    pub owner: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPanelResponse {
    pub panel_id: String,
    pub issuance: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionRequest {
    pub sender: String,
    pub receiver: String,
    pub amount: Decimal,
    #[serde(default)]
    pub panel_id: Option<String>,
    pub signature: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionResponse {
    pub txid: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ContractRequest {
    pub args: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractResponse {
    pub contract: String,
    pub result: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MineResponse {
    pub mined_index: u64,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub total_carbon_reduction: f64,
    pub reward: Decimal,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub saved: bool,
    pub dir: String,
}
