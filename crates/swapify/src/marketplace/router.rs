use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{PageRequest, PostId, ReviewId, UserId};
use super::error::MarketplaceError;
use super::identity::NewUser;
use super::lifecycle::{PostChanges, PostDraft};
use super::repository::{MarketplaceStore, MatchNotifier};
use super::reviews::{ReviewChanges, ReviewDraft};
use super::Marketplace;

/// Header carrying the authenticated user id, stamped by the auth layer upstream.
pub const ACTOR_HEADER: &str = "x-user-id";

type Shared<S, N> = State<Arc<Marketplace<S, N>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InterestRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SelectionRequest {
    user_id: UserId,
}

/// Router builder exposing the lifecycle, review, and identity operations.
pub fn marketplace_router<S, N>(marketplace: Arc<Marketplace<S, N>>) -> Router
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    Router::new()
        .route("/api/v1/users", post(register_handler::<S, N>))
        .route("/api/v1/users/:user_id", get(profile_handler::<S, N>))
        .route("/api/v1/users/:user_id/stats", get(user_stats_handler::<S, N>))
        .route(
            "/api/v1/users/:user_id/reviews",
            get(user_reviews_handler::<S, N>),
        )
        .route(
            "/api/v1/users/:user_id/reviews/stats",
            get(review_stats_handler::<S, N>),
        )
        .route(
            "/api/v1/posts",
            post(create_post_handler::<S, N>).get(list_posts_handler::<S, N>),
        )
        .route(
            "/api/v1/posts/:post_id",
            get(get_post_handler::<S, N>)
                .put(update_post_handler::<S, N>)
                .delete(delete_post_handler::<S, N>),
        )
        .route(
            "/api/v1/posts/:post_id/interest",
            post(interest_handler::<S, N>),
        )
        .route("/api/v1/posts/:post_id/select", post(select_handler::<S, N>))
        .route(
            "/api/v1/posts/:post_id/complete",
            post(complete_handler::<S, N>),
        )
        .route("/api/v1/posts/:post_id/cancel", post(cancel_handler::<S, N>))
        .route(
            "/api/v1/maintenance/purge-expired",
            post(purge_expired_handler::<S, N>),
        )
        .route("/api/v1/reviews", post(create_review_handler::<S, N>))
        .route(
            "/api/v1/reviews/:review_id",
            axum::routing::put(update_review_handler::<S, N>)
                .delete(delete_review_handler::<S, N>),
        )
        .with_state(marketplace)
}

pub(crate) fn actor(headers: &HeaderMap) -> Result<UserId, MarketplaceError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or(MarketplaceError::Unauthenticated)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MarketplaceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| MarketplaceError::Validation(rejection.body_text()))
}

pub(crate) async fn register_handler<S, N>(
    State(marketplace): Shared<S, N>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let user = marketplace.identity.register(body(payload)?)?;
    Ok((StatusCode::CREATED, Json(user.profile())).into_response())
}

pub(crate) async fn profile_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(user_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let profile = marketplace.identity.profile(&UserId(user_id))?;
    Ok(Json(profile).into_response())
}

pub(crate) async fn user_stats_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(user_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let stats = marketplace.identity.stats(&UserId(user_id))?;
    Ok(Json(json!({ "stats": stats })).into_response())
}

pub(crate) async fn user_reviews_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(user_id): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let reviews = marketplace.reviews.reviews_for(&UserId(user_id), page)?;
    Ok(Json(reviews).into_response())
}

pub(crate) async fn review_stats_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(user_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let stats = marketplace.reviews.stats(&UserId(user_id))?;
    Ok(Json(json!({ "stats": stats })).into_response())
}

pub(crate) async fn create_post_handler<S, N>(
    State(marketplace): Shared<S, N>,
    headers: HeaderMap,
    payload: Result<Json<PostDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let author = actor(&headers)?;
    let post = marketplace.lifecycle.create(&author, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(post)).into_response())
}

pub(crate) async fn list_posts_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Query(page): Query<PageRequest>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let posts = marketplace.lifecycle.list_open(page)?;
    Ok(Json(posts).into_response())
}

pub(crate) async fn get_post_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let post = marketplace.lifecycle.get(&PostId(post_id))?;
    Ok(Json(post).into_response())
}

pub(crate) async fn update_post_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<PostChanges>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    let post = marketplace
        .lifecycle
        .update(&PostId(post_id), &acting, body(payload)?)?;
    Ok(Json(post).into_response())
}

pub(crate) async fn delete_post_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    marketplace.lifecycle.delete(&PostId(post_id), &acting)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn interest_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let user = actor(&headers)?;
    // An empty body means "no message"; anything else must be a valid request.
    let request = if raw.is_empty() {
        InterestRequest::default()
    } else {
        body(Json::<InterestRequest>::from_bytes(&raw))?
    };
    let post = marketplace
        .lifecycle
        .express_interest(&PostId(post_id), &user, request.message)?;
    Ok(Json(post).into_response())
}

pub(crate) async fn select_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<SelectionRequest>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    let request = body(payload)?;
    let post = marketplace
        .lifecycle
        .select_user(&PostId(post_id), &acting, &request.user_id)?;
    Ok(Json(post).into_response())
}

pub(crate) async fn complete_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    let outcome = marketplace.lifecycle.complete(&PostId(post_id), &acting)?;
    Ok(Json(outcome).into_response())
}

pub(crate) async fn cancel_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    let post = marketplace.lifecycle.cancel(&PostId(post_id), &acting)?;
    Ok(Json(post).into_response())
}

pub(crate) async fn purge_expired_handler<S, N>(
    State(marketplace): Shared<S, N>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let purged = marketplace.lifecycle.purge_expired()?;
    Ok(Json(json!({ "purged": purged })).into_response())
}

pub(crate) async fn create_review_handler<S, N>(
    State(marketplace): Shared<S, N>,
    headers: HeaderMap,
    payload: Result<Json<ReviewDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let reviewer = actor(&headers)?;
    let review = marketplace.reviews.create(&reviewer, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(review)).into_response())
}

pub(crate) async fn update_review_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ReviewChanges>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    let review = marketplace
        .reviews
        .update(&ReviewId(review_id), &acting, body(payload)?)?;
    Ok(Json(review).into_response())
}

pub(crate) async fn delete_review_handler<S, N>(
    State(marketplace): Shared<S, N>,
    Path(review_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let acting = actor(&headers)?;
    marketplace.reviews.delete(&ReviewId(review_id), &acting)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
