use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::Method,
    routing::get,
    Json,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    http_objects::{AssetsAPIError, BucketReconcileStatus, ReconcileResponse},
    provision::{required_buckets, BucketProvisioner},
};

#[derive(OpenApi)]
#[openapi(
    paths(reconcile_storage),
    components(schemas(ReconcileResponse, BucketReconcileStatus, AssetsAPIError)),
    tags(
        (name = "storage", description = "Managed asset storage operations")
    )
)]
struct ApiDoc;

#[derive(Clone)]
pub struct RouteState {
    pub provisioner: Arc<BucketProvisioner>,
}

pub fn create_routes(route_state: RouteState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs/swagger").url("/docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(index))
        .route(
            "/internal/storage/reconcile",
            get(reconcile_storage).with_state(route_state.clone()),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    let method = req.method();
                    let uri = req.uri();

                    let matched_path = req
                        .extensions()
                        .get::<MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::debug_span!("request", %method, %uri, matched_path)
                })
                .on_failure(()),
        )
        .layer(cors)
}

async fn index() -> &'static str {
    "Assets Server"
}

/// Reconcile managed storage buckets against the declared policy table.
/// Idempotent; operators can call this at any time, and the service calls
/// it once on its own at boot.
#[utoipa::path(
    get,
    path = "/internal/storage/reconcile",
    tag = "storage",
    responses(
        (status = 200, description = "Reconciliation ran; see per-bucket results", body = ReconcileResponse),
        (status = INTERNAL_SERVER_ERROR, description = "Existing buckets could not be listed")
    ),
)]
async fn reconcile_storage(
    State(state): State<RouteState>,
) -> Result<Json<ReconcileResponse>, AssetsAPIError> {
    let results = state
        .provisioner
        .reconcile(&required_buckets())
        .await
        .map_err(AssetsAPIError::internal_error)?;
    Ok(Json(ReconcileResponse::from_results(results)))
}
