use actix_web::{get, post, web, HttpResponse, Responder};
use log::{info, warn};

use super::models::{error_response, AppState, RegisterPanelRequest, RegisterPanelResponse};
use crate::panel::PanelRecord;

/// Register a panel and mint its issuance.
#[post("/panels/")]
pub async fn register_panel(
    state: web::Data<AppState>,
    body: web::Json<RegisterPanelRequest>,
) -> impl Responder {
    let req = body.into_inner();
    let record = PanelRecord {
        panel_id: req.panel_id,
        production_date: req.production_date,
        nominal_efficiency_pct: req.nominal_efficiency_pct,
        size_m2: req.size_m2,
        manufacturer: req.manufacturer,
        manufacturing_footprint_kgco2: req.manufacturing_footprint_kgco2,
        lifetime_years: req.lifetime_years,
        carbon_reduction_factor: req.carbon_reduction_factor,
        owner: req.owner,
    };
    let panel_id = record.panel_id.clone();

    let issued = {
        let mut ledger = state.ledger.lock().expect("mutex poisoned");
        ledger.register_panel(record)
    };

    match issued {
        Ok(issuance) => {
            info!("POST /panels/ - registered {panel_id}, issued {issuance}");
            HttpResponse::Ok().json(RegisterPanelResponse { panel_id, issuance })
        }
        Err(e) => {
            warn!("POST /panels/ - rejected {panel_id}: {e}");
            error_response(&e)
        }
    }
}

/// Current registry contents.
#[get("/panels/")]
pub async fn list_panels(state: web::Data<AppState>) -> impl Responder {
    let ledger = state.ledger.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ledger.panels())
}
