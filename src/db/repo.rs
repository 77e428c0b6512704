use async_trait::async_trait;

use super::model::*;

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn list_users(&self) -> DbResult<Vec<User>>;
    async fn get_user_by_id(&self, id: i64) -> DbResult<User>;
    async fn get_user_by_name(&self, name: &str) -> DbResult<User>;
    async fn add_user(&self, name: &str, email: &str) -> DbResult<User>;
    async fn delete_user(&self, id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn list_user_movies(&self, user_id: i64) -> DbResult<Vec<Movie>>;
    async fn get_user_movie(&self, user_id: i64, movie_id: i64) -> DbResult<Movie>;
    async fn add_movie(&self, user_id: i64, movie: &NewMovie) -> DbResult<Movie>;
    async fn update_movie(&self, user_id: i64, movie_id: i64, update: &MovieUpdate) -> DbResult<Movie>;
    async fn delete_movie(&self, user_id: i64, movie_id: i64) -> DbResult<()>;
}

#[async_trait]
pub trait ReviewRepo: Send + Sync {
    async fn add_review(&self, user_id: i64, movie_id: i64, review_text: &str, rating: f64) -> DbResult<Review>;
    async fn get_review(&self, id: i64) -> DbResult<Review>;
    async fn get_movie_reviews(&self, movie_id: i64) -> DbResult<Vec<Review>>;
    async fn get_user_reviews(&self, user_id: i64) -> DbResult<UserReviews>;
    async fn get_all_movie_reviews(&self) -> DbResult<Vec<ReviewFeedEntry>>;
}

#[async_trait]
pub trait Repository: UserRepo + MovieRepo + ReviewRepo + Send + Sync {
    async fn close(&self);
}
