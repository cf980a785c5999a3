//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::{
    error::engine_error_response,
    web::{
        protocol::{ChallengeView, ProgressView, ScoreView, StatusDto, TierDto},
        state::AppState,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use trivia_core::{EngineError, EngineResult};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_progress_handler,
        create_challenge_handler,
        list_challenges_handler,
        get_challenge_handler,
        accept_challenge_handler,
        start_challenge_handler,
    ),
    components(
        schemas(CreateChallengeRequest, ChallengeView, ProgressView, ScoreView, TierDto, StatusDto)
    ),
    tags(
        (name = "Trivia API", description = "Solo progression and friend challenges.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

/// The payload for inviting a friend to a challenge.
#[derive(Deserialize, ToSchema)]
pub struct CreateChallengeRequest {
    pub opponent_id: Uuid,
    pub tier: TierDto,
    pub question_count: u32,
}

type HandlerError = (StatusCode, String);

fn reject(action: &str, e: EngineError) -> HandlerError {
    if matches!(e, EngineError::Persistence(_)) {
        error!("Failed to {}: {:?}", action, e);
    }
    engine_error_response(e)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Get the caller's solo progress. Players who never played start at Easy.
#[utoipa::path(
    get,
    path = "/solo/progress",
    responses(
        (status = 200, description = "Current solo progress", body = ProgressView),
        (status = 401, description = "Missing or invalid x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ProgressView>, HandlerError> {
    let session = app_state
        .solo
        .session(user_id)
        .await
        .map_err(|e| reject("load solo progress", e))?;
    Ok(Json(session.progress().into()))
}

/// Invite a friend to a challenge.
#[utoipa::path(
    post,
    path = "/challenges",
    request_body = CreateChallengeRequest,
    responses(
        (status = 201, description = "Challenge created", body = ChallengeView),
        (status = 400, description = "Opponent is not a friend, or the question count is invalid"),
        (status = 401, description = "Missing or invalid x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn create_challenge_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let challenge = app_state
        .challenges
        .create(user_id, req.opponent_id, req.tier.into(), req.question_count)
        .await
        .map_err(|e| reject("create challenge", e))?;

    info!(challenge_id = %challenge.id, initiator = %user_id, "Challenge created via REST.");
    Ok((StatusCode::CREATED, Json(ChallengeView::from(&challenge))))
}

/// List every challenge the caller takes part in, newest first.
#[utoipa::path(
    get,
    path = "/challenges",
    responses(
        (status = 200, description = "The caller's challenges", body = [ChallengeView]),
        (status = 401, description = "Missing or invalid x-user-id header"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_challenges_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<ChallengeView>>, HandlerError> {
    let challenges = app_state
        .challenges
        .challenges_for(user_id)
        .await
        .map_err(|e| reject("list challenges", e))?;
    Ok(Json(challenges.iter().map(ChallengeView::from).collect()))
}

/// Get one challenge. Only its two participants may read it.
#[utoipa::path(
    get,
    path = "/challenges/{id}",
    responses(
        (status = 200, description = "The challenge", body = ChallengeView),
        (status = 403, description = "The caller is not a participant"),
        (status = 404, description = "Challenge not found"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The challenge id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_challenge_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<ChallengeView>, HandlerError> {
    let result: EngineResult<_> = async {
        let challenge = app_state.challenges.get(challenge_id).await?;
        if challenge.side_of(user_id).is_none() {
            return Err(EngineError::NotAParticipant {
                user_id,
                challenge_id,
            });
        }
        Ok(challenge)
    }
    .await;

    let challenge = result.map_err(|e| reject("get challenge", e))?;
    Ok(Json(ChallengeView::from(&challenge)))
}

/// Accept a pending challenge. Only the invited opponent may accept.
#[utoipa::path(
    post,
    path = "/challenges/{id}/accept",
    responses(
        (status = 200, description = "Challenge accepted", body = ChallengeView),
        (status = 403, description = "The caller is not the opponent"),
        (status = 404, description = "Challenge not found"),
        (status = 409, description = "The challenge is not pending"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The challenge id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn accept_challenge_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<ChallengeView>, HandlerError> {
    let challenge = app_state
        .challenges
        .accept(challenge_id, user_id)
        .await
        .map_err(|e| reject("accept challenge", e))?;
    Ok(Json(ChallengeView::from(&challenge)))
}

/// Start an accepted challenge. Only the initiator may start it.
#[utoipa::path(
    post,
    path = "/challenges/{id}/start",
    responses(
        (status = 200, description = "Challenge started", body = ChallengeView),
        (status = 403, description = "The caller is not the initiator"),
        (status = 404, description = "Challenge not found"),
        (status = 409, description = "The challenge has not been accepted"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("id" = Uuid, Path, description = "The challenge id."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn start_challenge_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(challenge_id): Path<Uuid>,
) -> Result<Json<ChallengeView>, HandlerError> {
    let challenge = app_state
        .challenges
        .start(challenge_id, user_id)
        .await
        .map_err(|e| reject("start challenge", e))?;
    Ok(Json(ChallengeView::from(&challenge)))
}
