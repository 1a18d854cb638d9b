mod prompts;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use promptlib_store::PromptStore;

#[derive(Clone)]
pub struct AppState {
    pub store: PromptStore,
    pub modalities: Arc<Vec<String>>,
}

pub fn create_router(store: PromptStore, modalities: Vec<String>) -> Router {
    let state = AppState {
        store,
        modalities: Arc::new(modalities),
    };

    Router::new()
        .route(
            "/api/prompts",
            get(prompts::list_prompts).post(prompts::create_prompt),
        )
        .route(
            "/api/prompts/{id}",
            get(prompts::get_prompt).delete(prompts::delete_prompt),
        )
        .route("/api/modalities", get(prompts::list_modalities))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
