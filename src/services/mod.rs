/// OpenAPI documentation generation.
pub mod documentation;
/// Round orchestration: joins, selections, task completions, resets.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision and degraded mode handling.
pub mod storage_supervisor;
/// Background reconciliation of the persisted round snapshot.
pub mod sync_service;
