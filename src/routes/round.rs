use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::game::{JoinRequest, RoundSummary},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes operating on the single shared round.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/round", get(get_round))
        .route("/round/players", post(join_round))
        .route("/round/players/{id}/select", post(select_player))
        .route("/round/tasks/{task_id}/complete", post(complete_task))
        .route("/round/reset", post(reset_round))
}

/// Return the full state of the shared round.
#[utoipa::path(
    get,
    path = "/round",
    tag = "round",
    responses(
        (status = 200, description = "Current round", body = RoundSummary)
    )
)]
pub async fn get_round(State(state): State<SharedState>) -> Json<RoundSummary> {
    Json(game_service::get_round(&state).await)
}

/// Join the round under a display name, or re-join an existing player.
#[utoipa::path(
    post,
    path = "/round/players",
    tag = "round",
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Player joined and selected", body = RoundSummary),
        (status = 400, description = "Blank name or avatar id"),
        (status = 404, description = "Unknown avatar id")
    )
)]
pub async fn join_round(
    State(state): State<SharedState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    payload.validate()?;
    let summary = game_service::join_round(&state, payload).await?;
    Ok(Json(summary))
}

/// Select the player that subsequent task completions apply to.
#[utoipa::path(
    post,
    path = "/round/players/{id}/select",
    tag = "round",
    params(("id" = String, Path, description = "Identifier of the player to select")),
    responses(
        (status = 200, description = "Player selected", body = RoundSummary),
        (status = 404, description = "Unknown player; the selection is cleared")
    )
)]
pub async fn select_player(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoundSummary>, AppError> {
    let summary = game_service::select_player(&state, &id).await?;
    Ok(Json(summary))
}

/// Check a task off the selected player's checklist.
#[utoipa::path(
    post,
    path = "/round/tasks/{task_id}/complete",
    tag = "round",
    params(("task_id" = String, Path, description = "Identifier of the task to complete")),
    responses(
        (status = 200, description = "Task completed", body = RoundSummary),
        (status = 404, description = "No such task on the selected player's checklist"),
        (status = 409, description = "No player is currently selected")
    )
)]
pub async fn complete_task(
    State(state): State<SharedState>,
    Path(task_id): Path<String>,
) -> Result<Json<RoundSummary>, AppError> {
    let summary = game_service::complete_task(&state, &task_id).await?;
    Ok(Json(summary))
}

/// Start the next race: clear all completions and the winner, keep the roster.
#[utoipa::path(
    post,
    path = "/round/reset",
    tag = "round",
    responses(
        (status = 200, description = "Round reset", body = RoundSummary)
    )
)]
pub async fn reset_round(State(state): State<SharedState>) -> Json<RoundSummary> {
    Json(game_service::reset_round(&state).await)
}
