use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Task Race Back.
#[openapi(
    paths(
        crate::routes::round::get_round,
        crate::routes::round::join_round,
        crate::routes::round::select_player,
        crate::routes::round::complete_task,
        crate::routes::round::reset_round,
        crate::routes::avatars::list_avatars,
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
    ),
    components(
        schemas(
            crate::dto::game::JoinRequest,
            crate::dto::game::RoundSummary,
            crate::dto::game::PlayerSummary,
            crate::dto::game::TaskSummary,
            crate::dto::game::AvatarSummary,
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::NotifyEvent,
            crate::dto::sse::Toast,
            crate::dto::sse::SoundCue,
        )
    ),
    tags(
        (name = "round", description = "Shared morning race round"),
        (name = "avatars", description = "Avatar catalog"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "health", description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
