pub mod routes;
pub mod store;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::schema::schema_model::FormSchema;
use store::SubmissionStore;

/// Schema ids of the two fields the service accepts.
pub const AADHAAR_FIELD_ID: &str = "ctl00_ContentPlaceHolder1_txtadharno";
pub const NAME_FIELD_ID: &str = "ctl00_ContentPlaceHolder1_txtownername";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SubmissionStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn SubmissionStore>) -> Self {
        Self { store }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::liveness))
        .route("/api/udyam/step1", post(routes::submit_step1))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Log whether the scraped schema declares the fields this service validates.
/// Returns the ids that are missing.
pub fn check_schema(schema: &FormSchema) -> Vec<&'static str> {
    let missing: Vec<&'static str> = [AADHAAR_FIELD_ID, NAME_FIELD_ID]
        .into_iter()
        .filter(|id| schema.field(id).is_none())
        .collect();

    if missing.is_empty() {
        info!("Schema declares the Aadhaar and entrepreneur name fields");
    } else {
        for id in &missing {
            warn!("Schema has no field '{}'", id);
        }
    }
    missing
}

pub async fn serve(port: u16, state: AppState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on port {}", port);
    axum::serve(listener, build_router(state)).await
}
