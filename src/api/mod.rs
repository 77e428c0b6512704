pub mod error;
pub mod handlers;
pub mod types;

pub use error::*;
pub use handlers::*;
pub use types::*;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::server::AppState;

/// JSON routes, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:user_id", get(get_user).delete(delete_user))
        .route("/users/:user_id/movies", get(list_user_movies).post(add_movie))
        .route("/users/:user_id/movies/lookup", post(lookup_and_add_movie))
        .route(
            "/users/:user_id/movies/:movie_id",
            put(update_movie).delete(delete_movie),
        )
        .route("/users/:user_id/movies/:movie_id/reviews", post(add_review))
        .route("/users/:user_id/reviews", get(get_user_reviews))
        .route("/movies/:movie_id/reviews", get(get_movie_reviews))
        .route("/reviews", get(list_reviews))
        .route("/reviews/:review_id", get(get_review))
}
