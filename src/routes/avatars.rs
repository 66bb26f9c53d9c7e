use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::game::AvatarSummary, services::game_service, state::SharedState};

/// Return the catalog of avatars players can pick from.
#[utoipa::path(
    get,
    path = "/avatars",
    tag = "avatars",
    responses(
        (status = 200, description = "Avatar catalog", body = [AvatarSummary])
    )
)]
pub async fn list_avatars(State(state): State<SharedState>) -> Json<Vec<AvatarSummary>> {
    Json(game_service::list_avatars(&state))
}

/// Configure the avatar catalog subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/avatars", get(list_avatars))
}
