use actix_web::{post, web, HttpResponse, Responder};
use log::{debug, warn};

use super::models::{error_response, AppState, ContractRequest, ContractResponse};

/// Execute a named contract with positional JSON arguments.
#[post("/contracts/{name}/")]
pub async fn execute_contract(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
    body: web::Json<ContractRequest>,
) -> impl Responder {
    let name = path.into_inner().0;
    match state.contracts.execute(&name, &body.args) {
        Ok(result) => {
            debug!("POST /contracts/{name}/ - ok");
            HttpResponse::Ok().json(ContractResponse {
                contract: name,
                result,
            })
        }
        Err(e) => {
            warn!("POST /contracts/{name}/ - {e}");
            error_response(&e)
        }
    }
}
