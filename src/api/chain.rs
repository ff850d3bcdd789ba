use std::sync::atomic::AtomicBool;

use actix_web::{get, post, web, HttpResponse, Responder};
use log::{info, warn};

use crate::economics::block_reward;

use super::models::{
    error_response, AppState, ChainResponse, MineRequest, MineResponse, SnapshotResponse,
    ValidateResponse,
};

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let resp = ChainResponse {
        length: ledger.chain().len(),
        chain: ledger.chain(),
    };
    HttpResponse::Ok().json(resp)
}

/// Validate the whole chain.
#[get("/validate/")]
pub async fn validate_chain(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    let result = ledger.validate();
    HttpResponse::Ok().json(ValidateResponse {
        valid: result.is_ok(),
        length: ledger.chain().len(),
        error: result.err().map(|e| e.to_string()),
    })
}

/// Chain summary: height, payload counts, cumulative reduction, baseline.
#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.info())
}

/// Run one mining round. The ledger lock is held only to check out the
/// mining job and to commit the sealed block; the nonce search runs
/// lock-free so producers keep enqueueing meanwhile. A commit that loses
/// the tip race maps to 409.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let miner = req.miner_address.trim().to_string();

    let job = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.prepare_mining_job(&miner)
    };
    let job = match job {
        Ok(job) => job,
        Err(e) => {
            warn!("POST /mine/ - no job: {e}");
            return error_response(&e);
        }
    };

    let block = match job.run(&AtomicBool::new(false)) {
        Ok(block) => block,
        Err(e) => return error_response(&e),
    };

    let committed = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.commit_block(block).map(|b| MineResponse {
            mined_index: b.index,
            hash: b.hash.clone(),
            nonce: b.nonce,
            difficulty: b.difficulty,
            total_carbon_reduction: b.total_carbon_reduction,
            reward: block_reward(b.index),
        })
    };

    match committed {
        Ok(resp) => {
            info!(
                "POST /mine/ - block {} accepted at difficulty {}",
                resp.mined_index, resp.difficulty
            );
            HttpResponse::Ok().json(resp)
        }
        Err(e) => {
            warn!("POST /mine/ - commit failed: {e}");
            error_response(&e)
        }
    }
}

/// Persist the three snapshot documents.
#[post("/snapshot/save/")]
pub async fn save_snapshot(state: web::Data<AppState>) -> impl Responder {
    let result = {
        let ledger = state.ledger.lock().expect("mutex poisoned");
        state.store.save(&ledger)
    };
    match result {
        Ok(()) => HttpResponse::Ok().json(SnapshotResponse {
            saved: true,
            dir: state.store.dir().display().to_string(),
        }),
        Err(e) => error_response(&e),
    }
}
