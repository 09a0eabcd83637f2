//! REST endpoints for categories, articles and authors.
//!
//! Handlers resolve the actor from the session cookie, pick the projection
//! for their action and hand the rest to the collection.
use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::collections::{ArticlePayload, Articles, Authors, Categories, CategoryPayload};
use crate::errors::{BlogError, FieldErrors};
use crate::permissions::Action;
use crate::projection::Projection;
use crate::web::{current_actor, AppState};

type ApiResult<T> = Result<T, BlogError>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(list_categories).post(create_category))
        .route(
            "/categories/{id}/",
            get(retrieve_category)
                .put(update_category)
                .patch(partial_update_category)
                .delete(delete_category),
        )
        .route("/articles/", get(list_articles).post(create_article))
        .route(
            "/articles/{id}/",
            get(retrieve_article)
                .put(update_article)
                .patch(partial_update_article)
                .delete(delete_article),
        )
        // read-only: other verbs get 405 from the router
        .route("/authors/", get(list_authors))
        .route("/authors/{id}/", get(retrieve_author))
}

/// Ids that do not parse can never match a row.
fn parse_id(raw: &str) -> ApiResult<i32> {
    raw.parse().map_err(|_| BlogError::NotFound)
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(payload)| payload).map_err(|rejection| {
        BlogError::Validation(FieldErrors::single(
            "non_field_errors",
            rejection.body_text(),
        ))
    })
}

fn filter_param<'q>(query: &'q HashMap<String, String>, name: &str) -> Option<&'q str> {
    query.get(name).map(String::as_str)
}

// ============================================================================
// Categories
// ============================================================================

async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let filter = filter_param(&query, Categories::FILTER_PARAM);
    let categories = Categories::new(&state.db).list(filter).await?;
    tracing::debug!(count = categories.len(), ?filter, "listed categories");
    Ok(Json(Projection::for_action(Action::List).render_all(&categories)?))
}

async fn retrieve_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let category = Categories::new(&state.db).retrieve(parse_id(&id)?).await?;
    Ok(Json(Projection::for_action(Action::Retrieve).render(&category)?))
}

async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CategoryPayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let actor = current_actor(&state, &headers).await?;
    let category = Categories::new(&state.db)
        .create(parse_body(body)?, &actor)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Projection::for_action(Action::Create).render(&category)?),
    ))
}

async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<CategoryPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let actor = current_actor(&state, &headers).await?;
    let category = Categories::new(&state.db)
        .update(parse_id(&id)?, parse_body(body)?, &actor)
        .await?;
    Ok(Json(Projection::for_action(Action::Update).render(&category)?))
}

async fn partial_update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<CategoryPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let actor = current_actor(&state, &headers).await?;
    let category = Categories::new(&state.db)
        .partial_update(parse_id(&id)?, parse_body(body)?, &actor)
        .await?;
    Ok(Json(
        Projection::for_action(Action::PartialUpdate).render(&category)?,
    ))
}

async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let actor = current_actor(&state, &headers).await?;
    Categories::new(&state.db)
        .delete(parse_id(&id)?, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Articles
// ============================================================================

async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let filter = filter_param(&query, Articles::FILTER_PARAM);
    let articles = Articles::new(&state.db).list(filter).await?;
    tracing::debug!(count = articles.len(), ?filter, "listed articles");
    Ok(Json(Projection::for_action(Action::List).render_all(&articles)?))
}

async fn retrieve_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let article = Articles::new(&state.db).retrieve(parse_id(&id)?).await?;
    Ok(Json(Projection::for_action(Action::Retrieve).render(&article)?))
}

async fn create_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ArticlePayload>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let actor = current_actor(&state, &headers).await?;
    let article = Articles::new(&state.db)
        .create(parse_body(body)?, &actor)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(Projection::for_action(Action::Create).render(&article)?),
    ))
}

async fn update_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<ArticlePayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let actor = current_actor(&state, &headers).await?;
    let article = Articles::new(&state.db)
        .update(parse_id(&id)?, parse_body(body)?, &actor)
        .await?;
    Ok(Json(Projection::for_action(Action::Update).render(&article)?))
}

async fn partial_update_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<ArticlePayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let actor = current_actor(&state, &headers).await?;
    let article = Articles::new(&state.db)
        .partial_update(parse_id(&id)?, parse_body(body)?, &actor)
        .await?;
    Ok(Json(
        Projection::for_action(Action::PartialUpdate).render(&article)?,
    ))
}

async fn delete_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let actor = current_actor(&state, &headers).await?;
    Articles::new(&state.db)
        .delete(parse_id(&id)?, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Authors
// ============================================================================

async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let filter = filter_param(&query, Authors::FILTER_PARAM);
    let authors = Authors::new(&state.db).list(filter).await?;
    tracing::debug!(count = authors.len(), ?filter, "listed authors");
    Ok(Json(Projection::for_action(Action::List).render_all(&authors)?))
}

async fn retrieve_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let author = Authors::new(&state.db).retrieve(parse_id(&id)?).await?;
    Ok(Json(Projection::for_action(Action::Retrieve).render(&author)?))
}
