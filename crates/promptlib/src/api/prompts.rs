use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use promptlib_store::{Prompt, PromptFilter, RemoveOutcome, StoreError};

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub modality: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromptRequest {
    pub text: String,
    pub modality: String,
    /// Comma-separated, as typed into the tags field
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeletePromptResponse {
    pub removed: usize,
}

fn error_response(e: StoreError) -> (StatusCode, String) {
    let status = if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, e.to_string())
}

pub async fn list_prompts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Prompt>>, (StatusCode, String)> {
    let filter = PromptFilter::from_inputs(
        params.q.as_deref().unwrap_or_default(),
        params.modality.as_deref().unwrap_or_default(),
    );

    let prompts = state.store.search(&filter).await.map_err(error_response)?;

    Ok(Json(prompts))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Prompt>, (StatusCode, String)> {
    state
        .store
        .get(&id)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No prompt with id {}", id)))
}

pub async fn create_prompt(
    State(state): State<AppState>,
    Json(request): Json<CreatePromptRequest>,
) -> Result<(StatusCode, Json<Prompt>), (StatusCode, String)> {
    let prompt = state
        .store
        .add(&request.text, &request.modality, &request.tags)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(prompt)))
}

/// Deleting an unknown id succeeds with `removed: 0`.
pub async fn delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletePromptResponse>, (StatusCode, String)> {
    let removed = match state.store.remove(&id).await.map_err(error_response)? {
        RemoveOutcome::Removed(count) => count,
        RemoveOutcome::NotFound => 0,
    };

    Ok(Json(DeletePromptResponse { removed }))
}

pub async fn list_modalities(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.modalities.as_ref().clone())
}
