use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::info;

use super::error::ApiError;
use super::types::*;
use crate::db::{Movie, MovieUpdate, Review, ReviewFeedEntry, User, UserReviews};
use crate::server::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Unwrap a JSON body, turning extractor rejections into validation errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::validation(e.body_text()))
}

/// Unwrap path parameters, turning extractor rejections into validation errors.
fn path<T>(params: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    params
        .map(|Path(value)| value)
        .map_err(|e| ApiError::validation(e.body_text()))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.list_users().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let (name, email) = body(payload)?.validate()?;
    let user = state.db.add_user(&name, &email).await?;
    info!(user_id = user.id, name = %user.name, "User added");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<User>> {
    let user_id = path(params)?;
    Ok(Json(state.db.get_user_by_id(user_id).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let user_id = path(params)?;
    state.db.delete_user(user_id).await?;
    info!(user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_user_movies(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<Movie>>> {
    let user_id = path(params)?;
    Ok(Json(state.db.list_user_movies(user_id).await?))
}

pub async fn add_movie(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AddMovieRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let user_id = path(params)?;
    let new_movie = body(payload)?.validate()?;
    let movie = state.db.add_movie(user_id, &new_movie).await?;
    info!(user_id, movie_id = movie.id, title = %movie.title, "Movie added");
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn lookup_and_add_movie(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
    payload: Result<Json<LookupMovieRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let user_id = path(params)?;
    let title = required("title", body(payload)?.title.as_deref())?;

    // Fail on an unknown user before spending an outbound request.
    state.db.get_user_by_id(user_id).await?;

    let new_movie = state.lookup.lookup(&title).await?;
    let movie = state.db.add_movie(user_id, &new_movie).await?;
    info!(user_id, movie_id = movie.id, title = %movie.title, "Movie added from lookup");
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update_movie(
    State(state): State<AppState>,
    params: Result<Path<(i64, i64)>, PathRejection>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> ApiResult<Json<Movie>> {
    let (user_id, movie_id) = path(params)?;
    let update = validate_update(body(payload)?)?;
    let movie = state.db.update_movie(user_id, movie_id, &update).await?;
    info!(user_id, movie_id, "Movie updated");
    Ok(Json(movie))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    params: Result<Path<(i64, i64)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let (user_id, movie_id) = path(params)?;
    state.db.delete_movie(user_id, movie_id).await?;
    info!(user_id, movie_id, "Movie removed from user");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_review(
    State(state): State<AppState>,
    params: Result<Path<(i64, i64)>, PathRejection>,
    payload: Result<Json<AddReviewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let (user_id, movie_id) = path(params)?;
    let (text, rating) = body(payload)?.validate()?;

    // Only movies from the user's own list can be reviewed.
    state.db.get_user_movie(user_id, movie_id).await?;

    let review = state.db.add_review(user_id, movie_id, &text, rating).await?;
    info!(user_id, movie_id, review_id = review.id, "Review added");
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_user_reviews(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<UserReviews>> {
    let user_id = path(params)?;
    Ok(Json(state.db.get_user_reviews(user_id).await?))
}

pub async fn get_movie_reviews(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<Review>>> {
    let movie_id = path(params)?;
    Ok(Json(state.db.get_movie_reviews(movie_id).await?))
}

pub async fn list_reviews(State(state): State<AppState>) -> ApiResult<Json<Vec<ReviewFeedEntry>>> {
    Ok(Json(state.db.get_all_movie_reviews().await?))
}

pub async fn get_review(
    State(state): State<AppState>,
    params: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Review>> {
    let review_id = path(params)?;
    Ok(Json(state.db.get_review(review_id).await?))
}
