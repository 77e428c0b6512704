use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context;
use tracing::info;

use super::views::*;
use crate::api::{self, ApiError};
use crate::db::{Movie, MovieUpdate, Review, User};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TitleForm {
    #[serde(default)]
    pub title: Option<String>,
}

/// Every field arrives as text; blank inputs mean "leave unchanged".
#[derive(Debug, Default, Deserialize)]
pub struct MovieForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

impl MovieForm {
    pub fn into_update(self) -> Result<MovieUpdate, ApiError> {
        let year = api::optional(self.year.as_deref())
            .map(|y| api::parse_number::<i32>("year", &y))
            .transpose()?;
        let rating = api::optional(self.rating.as_deref())
            .map(|r| api::parse_number::<f64>("rating", &r))
            .transpose()?;

        api::validate_update(MovieUpdate {
            title: api::optional(self.title.as_deref()),
            director: api::optional(self.director.as_deref()),
            year,
            rating,
            poster: api::optional(self.poster.as_deref()),
        })
    }
}

impl ReviewForm {
    pub fn validate(&self) -> Result<(String, f64), ApiError> {
        let text = api::required("review_text", self.review_text.as_deref())?;
        let rating = api::required("rating", self.rating.as_deref())?;
        let rating = api::check_rating(api::parse_number("rating", &rating)?)?;
        Ok((text, rating))
    }
}

#[derive(Serialize)]
struct UserMoviesPage<'a> {
    user: &'a User,
    movies: &'a [Movie],
}

#[derive(Serialize)]
struct UserMoviePage<'a> {
    user: &'a User,
    movie: &'a Movie,
}

#[derive(Serialize)]
struct ReviewLine {
    id: i64,
    movie_id: i64,
    movie_title: String,
    review_text: String,
    rating: f64,
    /// Still in the user's list, so the review page can be opened.
    listed: bool,
}

#[derive(Serialize)]
struct ReviewPage<'a> {
    user: &'a User,
    movie: &'a Movie,
    review: &'a Review,
    author: &'a User,
}

pub async fn home(State(state): State<AppState>) -> PageResult {
    page(&state, StatusCode::OK, "home.html", &Context::new())
}

pub async fn users(State(state): State<AppState>) -> PageResult {
    let users = state.db.list_users().await.or_page(&state)?;
    let mut ctx = Context::new();
    ctx.insert("users", &users);
    page(&state, StatusCode::OK, "users.html", &ctx)
}

pub async fn add_user_form(State(state): State<AppState>) -> PageResult {
    page(&state, StatusCode::OK, "add_user.html", &Context::new())
}

pub async fn add_user(State(state): State<AppState>, Form(form): Form<UserForm>) -> PageResult {
    let request = api::CreateUserRequest {
        name: form.name,
        email: form.email,
    };
    let (name, email) = request.validate().or_page(&state)?;
    let user = state.db.add_user(&name, &email).await.or_page(&state)?;
    info!(user_id = user.id, name = %user.name, "User added");
    Ok(Redirect::to("/users").into_response())
}

pub async fn user_movies(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let movies = state.db.list_user_movies(user_id).await.or_page(&state)?;
    let ctx = context(&UserMoviesPage {
        user: &user,
        movies: &movies,
    })
    .or_page(&state)?;
    page(&state, StatusCode::OK, "user_movies.html", &ctx)
}

pub async fn add_movie_form(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let mut ctx = Context::new();
    ctx.insert("user", &user);
    page(&state, StatusCode::OK, "add_movie.html", &ctx)
}

pub async fn add_movie(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Form(form): Form<TitleForm>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let title = api::required("title", form.title.as_deref()).or_page(&state)?;

    let movies = state.db.list_user_movies(user_id).await.or_page(&state)?;
    if let Some(existing) = movies.iter().find(|m| m.title.eq_ignore_ascii_case(&title)) {
        let mut ctx = Context::new();
        ctx.insert("user", &user);
        ctx.insert("existing", existing);
        return page(&state, StatusCode::CONFLICT, "add_movie.html", &ctx);
    }

    let new_movie = state.lookup.lookup(&title).await.or_page(&state)?;
    let movie = state.db.add_movie(user_id, &new_movie).await.or_page(&state)?;
    info!(user_id, movie_id = movie.id, title = %movie.title, "Movie added from lookup");
    Ok(Redirect::to(&format!("/users/{}/movies", user_id)).into_response())
}

pub async fn update_movie_form(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let movie = state.db.get_user_movie(user_id, movie_id).await.or_page(&state)?;
    let ctx = context(&UserMoviePage {
        user: &user,
        movie: &movie,
    })
    .or_page(&state)?;
    page(&state, StatusCode::OK, "update_movie.html", &ctx)
}

pub async fn update_movie(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
    Form(form): Form<MovieForm>,
) -> PageResult {
    let update = form.into_update().or_page(&state)?;
    state
        .db
        .update_movie(user_id, movie_id, &update)
        .await
        .or_page(&state)?;
    info!(user_id, movie_id, "Movie updated");
    Ok(Redirect::to(&format!("/users/{}/movies", user_id)).into_response())
}

pub async fn delete_movie_form(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let movie = state.db.get_user_movie(user_id, movie_id).await.or_page(&state)?;
    let ctx = context(&UserMoviePage {
        user: &user,
        movie: &movie,
    })
    .or_page(&state)?;
    page(&state, StatusCode::OK, "delete_movie.html", &ctx)
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
) -> PageResult {
    state.db.delete_movie(user_id, movie_id).await.or_page(&state)?;
    info!(user_id, movie_id, "Movie removed from user");
    Ok(Redirect::to(&format!("/users/{}/movies", user_id)).into_response())
}

pub async fn add_review_form(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let movie = state.db.get_user_movie(user_id, movie_id).await.or_page(&state)?;
    let reviews = state.db.get_movie_reviews(movie_id).await.or_page(&state)?;

    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx.insert("movie", &movie);
    ctx.insert("reviews", &reviews);
    page(&state, StatusCode::OK, "add_review.html", &ctx)
}

pub async fn add_review(
    State(state): State<AppState>,
    Path((user_id, movie_id)): Path<(i64, i64)>,
    Form(form): Form<ReviewForm>,
) -> PageResult {
    let (text, rating) = form.validate().or_page(&state)?;
    state.db.get_user_movie(user_id, movie_id).await.or_page(&state)?;
    let review = state
        .db
        .add_review(user_id, movie_id, &text, rating)
        .await
        .or_page(&state)?;
    info!(user_id, movie_id, review_id = review.id, "Review added");
    Ok(Redirect::to(&format!("/users/{}/reviews", user_id)).into_response())
}

pub async fn user_reviews(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let result = state.db.get_user_reviews(user_id).await.or_page(&state)?;

    let listed: HashSet<i64> = result.movies.iter().map(|m| m.id).collect();
    let reviews: Vec<ReviewLine> = result
        .reviews
        .into_iter()
        .map(|r| ReviewLine {
            id: r.id,
            movie_id: r.movie_id,
            listed: listed.contains(&r.movie_id),
            movie_title: r.movie_title,
            review_text: r.review_text,
            rating: r.rating,
        })
        .collect();

    let mut ctx = Context::new();
    ctx.insert("user", &user);
    ctx.insert("movies", &result.movies);
    ctx.insert("reviews", &reviews);
    page(&state, StatusCode::OK, "user_reviews.html", &ctx)
}

pub async fn display_review(
    State(state): State<AppState>,
    Path((user_id, movie_id, review_id)): Path<(i64, i64, i64)>,
) -> PageResult {
    let user = state.db.get_user_by_id(user_id).await.or_page(&state)?;
    let movie = state.db.get_user_movie(user_id, movie_id).await.or_page(&state)?;
    let review = state.db.get_review(review_id).await.or_page(&state)?;
    if review.movie_id != movie_id {
        return Err::<Response, _>(ApiError::NotFound(format!(
            "Review {} is not about movie {}",
            review_id, movie_id
        )))
        .or_page(&state);
    }
    let author = state.db.get_user_by_id(review.user_id).await.or_page(&state)?;

    let ctx = context(&ReviewPage {
        user: &user,
        movie: &movie,
        review: &review,
        author: &author,
    })
    .or_page(&state)?;
    page(&state, StatusCode::OK, "display_review.html", &ctx)
}

pub async fn movie_reviews(State(state): State<AppState>) -> PageResult {
    let reviews = state.db.get_all_movie_reviews().await.or_page(&state)?;
    let mut ctx = Context::new();
    ctx.insert("reviews", &reviews);
    page(&state, StatusCode::OK, "movie_reviews.html", &ctx)
}
