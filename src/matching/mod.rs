mod survey;

pub use survey::{
    AvailableDay, CommunicationStyle, MatchBreakdown, MatchingSurvey, MeetingFrequency,
    MentorField, MentorMatching, MentorRecommendation, MentoringFocus, RecommendationPage,
    SurveyAnswers, match_score,
};

use axum::{
    Json, Router, debug_handler,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{AppState, CoreResult, identity::Identity};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/survey", post(submit_survey))
        .route("/survey/me", get(my_survey).put(retake_survey))
        .route("/recommendations", get(recommendations))
}

#[debug_handler]
pub(crate) async fn submit_survey(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(answers): Json<SurveyAnswers>,
) -> CoreResult<(StatusCode, Json<MatchingSurvey>)> {
    let survey = MentorMatching::new(db_pool)
        .submit_survey(identity.user_id, answers)
        .await?;
    Ok((StatusCode::CREATED, Json(survey)))
}

#[debug_handler]
pub(crate) async fn my_survey(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
) -> CoreResult<Json<MatchingSurvey>> {
    let survey = MentorMatching::new(db_pool)
        .latest_survey(identity.user_id)
        .await?;
    Ok(Json(survey))
}

/// A retake inserts a fresh survey; the previous answers stay on record but
/// stop being the latest.
#[debug_handler]
pub(crate) async fn retake_survey(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Json(answers): Json<SurveyAnswers>,
) -> CoreResult<Json<MatchingSurvey>> {
    let survey = MentorMatching::new(db_pool)
        .submit_survey(identity.user_id, answers)
        .await?;
    Ok(Json(survey))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationsQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    10
}

#[debug_handler]
pub(crate) async fn recommendations(
    State(db_pool): State<SqlitePool>,
    identity: Identity,
    Query(RecommendationsQuery { limit, offset }): Query<RecommendationsQuery>,
) -> CoreResult<Json<RecommendationPage>> {
    let page = MentorMatching::new(db_pool)
        .recommendations(identity.user_id, limit, offset)
        .await?;
    Ok(Json(page))
}
