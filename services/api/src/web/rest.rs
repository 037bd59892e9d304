//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::CourseSummary;
use crate::web::state::AppState;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_courses_handler,
    ),
    components(
        schemas(CourseSummary)
    ),
    tags(
        (name = "Curriculum Chat API", description = "API endpoints for the curriculum chat assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the course catalog.
///
/// The catalog is fixed at process start; clients render it on the home screen.
#[utoipa::path(
    get,
    path = "/courses",
    responses(
        (status = 200, description = "The built-in course catalog", body = [CourseSummary])
    )
)]
pub async fn list_courses_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<CourseSummary>> {
    Json(app_state.catalog.iter().map(CourseSummary::from).collect())
}
