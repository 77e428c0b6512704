use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

use super::model::*;
use super::repo::*;

const MOVIE_COLUMNS: &str = "movie.id, movie.title, movie.director, movie.year, movie.rating, movie.poster";

const FEED_QUERY: &str = "SELECT review.id, review.user_id, user.name AS user_name,
        review.movie_id, movie.title AS movie_title,
        review.review_text, review.rating
     FROM review
     JOIN user ON user.id = review.user_id
     JOIN movie ON movie.id = review.movie_id";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(db_path)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        // An in-memory database lives only as long as its connections, so
        // pin it to a single connection that is never recycled.
        let pool = if db_path.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::query(schema).execute(&self.pool).await?;
        Ok(())
    }

    /// Writers take the lock up front so they queue on the busy timeout; a
    /// deferred transaction that upgrades from read to write fails instead.
    async fn begin_write(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn user_exists(tx: &mut Transaction<'_, Sqlite>, user_id: i64) -> DbResult<bool> {
    let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM user WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

async fn movie_exists(tx: &mut Transaction<'_, Sqlite>, movie_id: i64) -> DbResult<bool> {
    let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM movie WHERE id = ?")
        .bind(movie_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.is_some())
}

/// Whether the user's list holds a movie with this title, other than `except`.
async fn has_title(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    title: &str,
    except: Option<i64>,
) -> DbResult<bool> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT movie.id FROM movie
         JOIN user_movies ON user_movies.movie_id = movie.id
         WHERE user_movies.user_id = ? AND movie.title = ? AND movie.id IS NOT ?",
    )
    .bind(user_id)
    .bind(title)
    .bind(except)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.is_some())
}

async fn fetch_user_movie(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: i64,
    movie_id: i64,
) -> DbResult<Option<Movie>> {
    let movie = sqlx::query_as::<_, Movie>(&format!(
        "SELECT {} FROM movie
         JOIN user_movies ON user_movies.movie_id = movie.id
         WHERE user_movies.user_id = ? AND movie.id = ?",
        MOVIE_COLUMNS
    ))
    .bind(user_id)
    .bind(movie_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(movie)
}

async fn fetch_user_movies<'e, E>(executor: E, user_id: i64) -> DbResult<Vec<Movie>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let movies = sqlx::query_as::<_, Movie>(&format!(
        "SELECT {} FROM movie
         JOIN user_movies ON user_movies.movie_id = movie.id
         WHERE user_movies.user_id = ?
         ORDER BY movie.id",
        MOVIE_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(movies)
}

#[async_trait]
impl UserRepo for SqliteRepository {
    async fn list_users(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT id, name, email FROM user ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn get_user_by_id(&self, id: i64) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, name, email FROM user WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", id)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn get_user_by_name(&self, name: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>("SELECT id, name, email FROM user WHERE name = ? ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("User not found: {}", name)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn add_user(&self, name: &str, email: &str) -> DbResult<User> {
        let result = sqlx::query("INSERT INTO user (name, email) VALUES (?, ?)")
            .bind(name)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::AlreadyExists(format!("User already exists: {} <{}>", name, email))
                } else {
                    DbError::Sqlx(e)
                }
            })?;

        let user = User {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            email: email.to_string(),
        };
        debug!(user_id = user.id, "added user");
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> DbResult<()> {
        let mut tx = self.begin_write().await?;

        sqlx::query("DELETE FROM review WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_movies WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM user WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("User not found: {}", id)));
        }

        tx.commit().await?;
        debug!(user_id = id, "deleted user");
        Ok(())
    }
}

#[async_trait]
impl MovieRepo for SqliteRepository {
    async fn list_user_movies(&self, user_id: i64) -> DbResult<Vec<Movie>> {
        fetch_user_movies(&self.pool, user_id).await
    }

    async fn get_user_movie(&self, user_id: i64, movie_id: i64) -> DbResult<Movie> {
        let mut tx = self.pool.begin().await?;
        let movie = fetch_user_movie(&mut tx, user_id, movie_id).await?;
        tx.commit().await?;
        movie.ok_or_else(|| {
            DbError::NotFound(format!("Movie {} not found for user {}", movie_id, user_id))
        })
    }

    async fn add_movie(&self, user_id: i64, movie: &NewMovie) -> DbResult<Movie> {
        let mut tx = self.begin_write().await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(DbError::NotFound(format!("User not found: {}", user_id)));
        }

        if has_title(&mut tx, user_id, &movie.title, None).await? {
            return Err(DbError::AlreadyExists(format!(
                "User {} already has movie: {}",
                user_id, movie.title
            )));
        }

        // Reuse an identical movie row when one exists.
        sqlx::query(
            "INSERT OR IGNORE INTO movie (title, director, year, rating, poster)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(movie.year)
        .bind(movie.rating)
        .bind(&movie.poster)
        .execute(&mut *tx)
        .await?;

        let (movie_id,) = sqlx::query_as::<_, (i64,)>(
            "SELECT id FROM movie WHERE title = ? AND director = ? AND year = ? AND rating = ?",
        )
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(movie.year)
        .bind(movie.rating)
        .fetch_one(&mut *tx)
        .await?;

        if movie.poster.is_some() {
            sqlx::query("UPDATE movie SET poster = ? WHERE id = ? AND poster IS NULL")
                .bind(&movie.poster)
                .bind(movie_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("INSERT INTO user_movies (user_id, movie_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(movie_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::AlreadyExists(format!(
                        "User {} already has movie: {}",
                        user_id, movie.title
                    ))
                } else {
                    DbError::Sqlx(e)
                }
            })?;

        let stored = fetch_user_movie(&mut tx, user_id, movie_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Movie not found: {}", movie_id)))?;

        tx.commit().await?;
        debug!(user_id, movie_id, title = %stored.title, "added movie");
        Ok(stored)
    }

    async fn update_movie(&self, user_id: i64, movie_id: i64, update: &MovieUpdate) -> DbResult<Movie> {
        let mut tx = self.begin_write().await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(DbError::NotFound(format!("User not found: {}", user_id)));
        }
        if fetch_user_movie(&mut tx, user_id, movie_id).await?.is_none() {
            return Err(DbError::NotFound(format!(
                "Movie {} not found for user {}",
                movie_id, user_id
            )));
        }

        if let Some(title) = &update.title {
            if has_title(&mut tx, user_id, title, Some(movie_id)).await? {
                return Err(DbError::AlreadyExists(format!(
                    "User {} already has movie: {}",
                    user_id, title
                )));
            }
        }

        sqlx::query(
            "UPDATE movie SET
                title = COALESCE(?, title),
                director = COALESCE(?, director),
                year = COALESCE(?, year),
                rating = COALESCE(?, rating),
                poster = COALESCE(?, poster)
             WHERE id = ?",
        )
        .bind(&update.title)
        .bind(&update.director)
        .bind(update.year)
        .bind(update.rating)
        .bind(&update.poster)
        .bind(movie_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::AlreadyExists(format!("An identical movie already exists: {}", movie_id))
            } else {
                DbError::Sqlx(e)
            }
        })?;

        let movie = fetch_user_movie(&mut tx, user_id, movie_id)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Movie not found: {}", movie_id)))?;

        tx.commit().await?;
        debug!(user_id, movie_id, "updated movie");
        Ok(movie)
    }

    async fn delete_movie(&self, user_id: i64, movie_id: i64) -> DbResult<()> {
        let mut tx = self.begin_write().await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(DbError::NotFound(format!("User not found: {}", user_id)));
        }

        let result = sqlx::query("DELETE FROM user_movies WHERE user_id = ? AND movie_id = ?")
            .bind(user_id)
            .bind(movie_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "Movie {} not found for user {}",
                movie_id, user_id
            )));
        }

        tx.commit().await?;
        debug!(user_id, movie_id, "removed movie from user");
        Ok(())
    }
}

#[async_trait]
impl ReviewRepo for SqliteRepository {
    async fn add_review(&self, user_id: i64, movie_id: i64, review_text: &str, rating: f64) -> DbResult<Review> {
        let mut tx = self.begin_write().await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(DbError::NotFound(format!("User not found: {}", user_id)));
        }
        if !movie_exists(&mut tx, movie_id).await? {
            return Err(DbError::NotFound(format!("Movie not found: {}", movie_id)));
        }

        let result = sqlx::query(
            "INSERT INTO review (user_id, movie_id, review_text, rating) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(review_text)
        .bind(rating)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let review = Review {
            id: result.last_insert_rowid(),
            user_id,
            movie_id,
            review_text: review_text.to_string(),
            rating,
        };
        debug!(review_id = review.id, user_id, movie_id, "added review");
        Ok(review)
    }

    async fn get_review(&self, id: i64) -> DbResult<Review> {
        sqlx::query_as::<_, Review>(
            "SELECT id, user_id, movie_id, review_text, rating FROM review WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DbError::NotFound(format!("Review not found: {}", id)),
            _ => DbError::Sqlx(e),
        })
    }

    async fn get_movie_reviews(&self, movie_id: i64) -> DbResult<Vec<Review>> {
        let mut tx = self.pool.begin().await?;

        if !movie_exists(&mut tx, movie_id).await? {
            return Err(DbError::NotFound(format!("Movie not found: {}", movie_id)));
        }

        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, user_id, movie_id, review_text, rating FROM review
             WHERE movie_id = ? ORDER BY id",
        )
        .bind(movie_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reviews)
    }

    async fn get_user_reviews(&self, user_id: i64) -> DbResult<UserReviews> {
        let mut tx = self.pool.begin().await?;

        if !user_exists(&mut tx, user_id).await? {
            return Err(DbError::NotFound(format!("User not found: {}", user_id)));
        }

        let movies = fetch_user_movies(&mut *tx, user_id).await?;
        let reviews = sqlx::query_as::<_, ReviewFeedEntry>(&format!(
            "{} WHERE review.user_id = ? ORDER BY review.id",
            FEED_QUERY
        ))
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UserReviews { movies, reviews })
    }

    async fn get_all_movie_reviews(&self) -> DbResult<Vec<ReviewFeedEntry>> {
        let entries = sqlx::query_as::<_, ReviewFeedEntry>(&format!("{} ORDER BY review.id", FEED_QUERY))
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> SqliteRepository {
        SqliteRepository::new("sqlite::memory:").await.unwrap()
    }

    fn dune() -> NewMovie {
        NewMovie {
            title: "Dune".to_string(),
            director: "Villeneuve".to_string(),
            year: 2021,
            rating: 8.0,
            poster: None,
        }
    }

    async fn movie_rows(repo: &SqliteRepository) -> i64 {
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM movie")
            .fetch_one(&repo.pool)
            .await
            .unwrap()
            .0
    }

    async fn join_rows(repo: &SqliteRepository) -> i64 {
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM user_movies")
            .fetch_one(&repo.pool)
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_example_walkthrough() {
        let repo = repo().await;

        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        assert_eq!(ada.id, 1);

        let movie = repo.add_movie(ada.id, &dune()).await.unwrap();
        assert_eq!(movie.id, 1);
        assert_eq!(movie.title, "Dune");

        let movies = repo.list_user_movies(ada.id).await.unwrap();
        assert_eq!(movies, vec![movie]);

        repo.delete_movie(ada.id, 1).await.unwrap();
        assert!(repo.list_user_movies(ada.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_user_twice() {
        let repo = repo().await;
        repo.add_user("Ada", "ada@x.com").await.unwrap();

        let err = repo.add_user("Ada", "ada@x.com").await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));

        let err = repo.add_user("Ada", "other@x.com").await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));

        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_user() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();

        assert_eq!(repo.get_user_by_id(ada.id).await.unwrap(), ada);
        assert_eq!(repo.get_user_by_name("Ada").await.unwrap(), ada);
        assert!(matches!(repo.get_user_by_id(42).await, Err(DbError::NotFound(_))));
        assert!(matches!(repo.get_user_by_name("Bob").await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_same_movie_twice() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();

        repo.add_movie(ada.id, &dune()).await.unwrap();
        let err = repo.add_movie(ada.id, &dune()).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));

        // Same title, different director is still a duplicate for this user.
        let mut other = dune();
        other.director = "Lynch".to_string();
        other.year = 1984;
        let err = repo.add_movie(ada.id, &other).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));

        assert_eq!(join_rows(&repo).await, 1);
        assert_eq!(movie_rows(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_shared_movie_between_users() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let bob = repo.add_user("Bob", "bob@x.com").await.unwrap();

        let a = repo.add_movie(ada.id, &dune()).await.unwrap();
        let b = repo.add_movie(bob.id, &dune()).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(movie_rows(&repo).await, 1);
        assert_eq!(join_rows(&repo).await, 2);

        repo.delete_movie(ada.id, a.id).await.unwrap();
        assert!(repo.list_user_movies(ada.id).await.unwrap().is_empty());
        assert_eq!(repo.list_user_movies(bob.id).await.unwrap().len(), 1);
        assert_eq!(movie_rows(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_reused_movie_gets_poster() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let bob = repo.add_user("Bob", "bob@x.com").await.unwrap();

        repo.add_movie(ada.id, &dune()).await.unwrap();
        let mut with_poster = dune();
        with_poster.poster = Some("https://img/dune.jpg".to_string());
        let movie = repo.add_movie(bob.id, &with_poster).await.unwrap();
        assert_eq!(movie.poster.as_deref(), Some("https://img/dune.jpg"));
    }

    #[tokio::test]
    async fn test_add_movie_unknown_user() {
        let repo = repo().await;
        let err = repo.add_movie(7, &dune()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
        assert_eq!(movie_rows(&repo).await, 0);
    }

    #[tokio::test]
    async fn test_update_movie_partial() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let movie = repo.add_movie(ada.id, &dune()).await.unwrap();

        let update = MovieUpdate {
            rating: Some(9.1),
            ..Default::default()
        };
        let updated = repo.update_movie(ada.id, movie.id, &update).await.unwrap();
        assert_eq!(updated.rating, 9.1);
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.director, "Villeneuve");
        assert_eq!(updated.year, 2021);

        let err = repo.update_movie(42, movie.id, &update).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
        let err = repo.update_movie(ada.id, 42, &update).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_to_title_already_listed() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        repo.add_movie(ada.id, &dune()).await.unwrap();
        let mut arrival = dune();
        arrival.title = "Arrival".to_string();
        arrival.year = 2016;
        let arrival = repo.add_movie(ada.id, &arrival).await.unwrap();

        let rename = MovieUpdate {
            title: Some("Dune".to_string()),
            ..Default::default()
        };
        let err = repo.update_movie(ada.id, arrival.id, &rename).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));

        let titles: Vec<String> = repo
            .list_user_movies(ada.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Dune", "Arrival"]);

        // Keeping its own title is not a conflict.
        let same = MovieUpdate {
            title: Some("Arrival".to_string()),
            rating: Some(8.2),
            ..Default::default()
        };
        let updated = repo.update_movie(ada.id, arrival.id, &same).await.unwrap();
        assert_eq!(updated.rating, 8.2);
    }

    #[tokio::test]
    async fn test_update_to_identical_movie() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let bob = repo.add_user("Bob", "bob@x.com").await.unwrap();
        repo.add_movie(bob.id, &dune()).await.unwrap();
        let mut lower = dune();
        lower.rating = 6.0;
        let movie = repo.add_movie(ada.id, &lower).await.unwrap();

        let update = MovieUpdate {
            rating: Some(8.0),
            ..Default::default()
        };
        let err = repo.update_movie(ada.id, movie.id, &update).await.unwrap_err();
        assert!(matches!(err, DbError::AlreadyExists(_)));
        assert_eq!(repo.get_user_movie(ada.id, movie.id).await.unwrap().rating, 6.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_same_movie() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("movies.db");
        let repo = std::sync::Arc::new(
            SqliteRepository::new(&format!("sqlite://{}", path.display()))
                .await
                .unwrap(),
        );
        let user_id = repo.add_user("Ada", "ada@x.com").await.unwrap().id;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.add_movie(user_id, &dune()).await })
            })
            .collect();

        let mut added = 0;
        let mut duplicates = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => added += 1,
                Err(DbError::AlreadyExists(_)) => duplicates += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(added, 1);
        assert_eq!(duplicates, 7);
        assert_eq!(join_rows(&repo).await, 1);

        repo.close().await;
    }

    #[tokio::test]
    async fn test_delete_movie_not_found() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let movie = repo.add_movie(ada.id, &dune()).await.unwrap();

        assert!(matches!(repo.delete_movie(42, movie.id).await, Err(DbError::NotFound(_))));
        assert!(matches!(repo.delete_movie(ada.id, 42).await, Err(DbError::NotFound(_))));

        repo.delete_movie(ada.id, movie.id).await.unwrap();
        assert!(matches!(
            repo.delete_movie(ada.id, movie.id).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reviews() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let bob = repo.add_user("Bob", "bob@x.com").await.unwrap();
        let movie = repo.add_movie(ada.id, &dune()).await.unwrap();

        let first = repo.add_review(ada.id, movie.id, "Great sand.", 9.0).await.unwrap();
        // Duplicate reviews are allowed.
        repo.add_review(ada.id, movie.id, "Still great.", 8.5).await.unwrap();
        repo.add_review(bob.id, movie.id, "Too long.", 5.0).await.unwrap();

        assert_eq!(repo.get_review(first.id).await.unwrap(), first);
        assert_eq!(repo.get_movie_reviews(movie.id).await.unwrap().len(), 3);

        let ada_reviews = repo.get_user_reviews(ada.id).await.unwrap();
        assert_eq!(ada_reviews.movies.len(), 1);
        assert_eq!(ada_reviews.reviews.len(), 2);
        assert_eq!(ada_reviews.reviews[0].movie_title, "Dune");
        assert_eq!(ada_reviews.reviews[1].review_text, "Still great.");

        let feed = repo.get_all_movie_reviews().await.unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[2].user_name, "Bob");
        assert_eq!(feed[2].movie_title, "Dune");
        assert_eq!(feed[2].review_text, "Too long.");
    }

    #[tokio::test]
    async fn test_review_missing_references() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let movie = repo.add_movie(ada.id, &dune()).await.unwrap();

        assert!(matches!(
            repo.add_review(42, movie.id, "x", 1.0).await,
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            repo.add_review(ada.id, 42, "x", 1.0).await,
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(repo.get_movie_reviews(42).await, Err(DbError::NotFound(_))));
        assert!(matches!(repo.get_review(1).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_user_reviews_without_reviews() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        repo.add_movie(ada.id, &dune()).await.unwrap();

        let result = repo.get_user_reviews(ada.id).await.unwrap();
        assert_eq!(result.movies.len(), 1);
        assert!(result.reviews.is_empty());

        assert!(matches!(repo.get_user_reviews(42).await, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let repo = repo().await;
        let ada = repo.add_user("Ada", "ada@x.com").await.unwrap();
        let bob = repo.add_user("Bob", "bob@x.com").await.unwrap();
        let movie = repo.add_movie(ada.id, &dune()).await.unwrap();
        repo.add_movie(bob.id, &dune()).await.unwrap();
        repo.add_review(ada.id, movie.id, "Great sand.", 9.0).await.unwrap();
        repo.add_review(bob.id, movie.id, "Too long.", 5.0).await.unwrap();

        repo.delete_user(ada.id).await.unwrap();

        assert!(matches!(repo.get_user_by_id(ada.id).await, Err(DbError::NotFound(_))));
        assert_eq!(join_rows(&repo).await, 1);
        assert_eq!(movie_rows(&repo).await, 1);
        let feed = repo.get_all_movie_reviews().await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].user_name, "Bob");

        assert!(matches!(repo.delete_user(ada.id).await, Err(DbError::NotFound(_))));
    }
}
