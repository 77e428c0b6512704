pub mod handlers;
pub mod views;

pub use views::{Views, PageError, PageResult};

use axum::{routing::get, Router};

use crate::server::AppState;

/// Human-facing HTML routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home))
        .route("/users", get(handlers::users))
        .route("/add_user", get(handlers::add_user_form).post(handlers::add_user))
        .route("/users/:user_id/movies", get(handlers::user_movies))
        .route(
            "/users/:user_id/add_movie",
            get(handlers::add_movie_form).post(handlers::add_movie),
        )
        .route(
            "/users/:user_id/update_movie/:movie_id",
            get(handlers::update_movie_form).post(handlers::update_movie),
        )
        .route(
            "/users/:user_id/delete_movie/:movie_id",
            get(handlers::delete_movie_form).post(handlers::delete_movie),
        )
        .route(
            "/users/:user_id/movies/:movie_id/add_review",
            get(handlers::add_review_form).post(handlers::add_review),
        )
        .route("/users/:user_id/reviews", get(handlers::user_reviews))
        .route(
            "/display_review/:user_id/:movie_id/:review_id",
            get(handlers::display_review),
        )
        .route("/movie_reviews", get(handlers::movie_reviews))
}
