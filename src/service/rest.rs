//! REST lookup of usernames for sibling services.
//!
//! ```text
//! GET /api/login/user_name/{user_id}
//!   200  "<username>"
//!   403  {"detail": "Unauthorized"}        peer not in the allow-list
//!   404  {"detail": "User ID not found"}
//!   500  {"detail": "<error>"}
//! ```

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::RestConfig;
use crate::error::Result;
use crate::store::CredentialStore;
use crate::utils::metrics::global_metrics;

/// Shared state of the lookup handlers
#[derive(Debug, Clone)]
pub struct LookupState {
    store: Arc<CredentialStore>,
    allow_list: Vec<IpAddr>,
}

impl LookupState {
    pub fn new(store: Arc<CredentialStore>, allow_list: Vec<IpAddr>) -> Self {
        Self { store, allow_list }
    }

    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        self.allow_list.contains(&addr.to_canonical())
    }
}

/// Error body, shaped like the one existing callers already parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Register the lookup routes; the app must carry `web::Data<LookupState>`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/login/user_name/{user_id}", web::get().to(user_name));
}

/// Build the HTTP server without starting it.
pub fn build(config: &RestConfig, store: Arc<CredentialStore>) -> Result<Server> {
    let state = web::Data::new(LookupState::new(store, config.allowed_addrs()));
    info!(
        address = %config.address,
        allow_list = ?config.allow_list,
        "Starting REST lookup service"
    );

    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .workers(config.workers)
        .disable_signals()
        .bind(config.address.as_str())?
        .run();
    Ok(server)
}

async fn user_name(
    req: HttpRequest,
    state: web::Data<LookupState>,
    path: web::Path<String>,
) -> HttpResponse {
    let peer = req.peer_addr();
    if !peer.is_some_and(|addr| state.is_allowed(addr.ip())) {
        warn!(peer = ?peer, "Lookup refused for address outside the allow-list");
        global_metrics().lookup_denied();
        return HttpResponse::Forbidden().json(Detail::new("Unauthorized"));
    }

    // the peer check comes before any validation of the path
    let user_id = match path.parse::<u32>() {
        Ok(user_id) => user_id,
        Err(_) => return HttpResponse::NotFound().json(Detail::new("User ID not found")),
    };
    let store = state.store.clone();
    global_metrics().lookup();

    match web::block(move || store.lookup_by_id(user_id)).await {
        Ok(Ok(Some(username))) => HttpResponse::Ok().json(username),
        Ok(Ok(None)) => HttpResponse::NotFound().json(Detail::new("User ID not found")),
        Ok(Err(e)) => {
            error!(user_id, error = %e, "Lookup failed");
            HttpResponse::InternalServerError().json(Detail::new(e.to_string()))
        }
        Err(e) => {
            error!(user_id, error = %e, "Lookup task failed");
            HttpResponse::InternalServerError().json(Detail::new(e.to_string()))
        }
    }
}
