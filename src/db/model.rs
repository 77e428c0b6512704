use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub director: String,
    pub year: i32,
    pub rating: f64,
    pub poster: Option<String>,
}

/// Movie data as it arrives from a form, the JSON API or the metadata lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub director: String,
    pub year: i32,
    pub rating: f64,
    #[serde(default)]
    pub poster: Option<String>,
}

/// Partial movie update. Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub poster: Option<String>,
}

impl MovieUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.director.is_none()
            && self.year.is_none()
            && self.rating.is_none()
            && self.poster.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub review_text: String,
    pub rating: f64,
}

/// A user's movie list together with every review the user wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReviews {
    pub movies: Vec<Movie>,
    pub reviews: Vec<ReviewFeedEntry>,
}

/// A review joined with its author's name and the movie title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewFeedEntry {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub movie_id: i64,
    pub movie_title: String,
    pub review_text: String,
    pub rating: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;
