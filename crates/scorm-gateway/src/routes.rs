//! HTTP route definitions

use crate::{handlers, middleware, AppState};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Create the main router
pub fn create_router(state: Arc<AppState>) -> Router {
    // Single frontend origin, credentials allowed
    let cors = CorsLayer::new()
        .allow_origin(state.allowed_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    // Locally stored packages are served straight from the storage root
    let static_files = state.storage.local_root().map(ServeDir::new);

    // A folder named `folders` lists as `/folders/index.html`, which lands on
    // this route; anything but DELETE goes to the static files
    let mut folder_route = delete(handlers::delete_folder);
    if let Some(files) = &static_files {
        folder_route = folder_route.fallback_service(files.clone());
    }

    let mut router = Router::new()
        // Uploads
        .route(
            "/upload",
            post(handlers::upload_files).layer(body_limit(state.config.max_upload_size)),
        )
        .route(
            "/upload-chunk",
            post(handlers::upload_chunk).layer(body_limit(state.config.max_chunk_size)),
        )
        .route("/complete-upload", post(handlers::complete_upload))

        // Folders
        .route("/folders", get(handlers::list_folders))
        .route("/folders/{folder_name}", folder_route)

        // Service
        .route("/health", get(handlers::health_check));

    if let Some(files) = static_files {
        router = router.fallback_service(files);
    }

    router
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn body_limit(max: usize) -> DefaultBodyLimit {
    if max == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(max)
    }
}
