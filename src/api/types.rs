use serde::Deserialize;

use super::error::ApiError;
use crate::db::{MovieUpdate, NewMovie};

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 10.0;
pub const MIN_YEAR: i32 = 1800;
pub const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddMovieRequest {
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

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupMovieRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddReviewRequest {
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Trimmed, non-empty value of a required text field.
pub fn required(field: &str, value: Option<&str>) -> Result<String, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::validation(format!("Missing required field: {}", field)))
}

/// Empty form inputs count as "not supplied".
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::validation(format!("Invalid number for {}: {}", field, value)))
}

pub fn check_rating(rating: f64) -> Result<f64, ApiError> {
    if rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(ApiError::validation(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )))
    }
}

pub fn check_year(year: i32) -> Result<i32, ApiError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(ApiError::validation(format!("Invalid year: {}", year)))
    }
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(String, String), ApiError> {
        let name = required("name", self.name.as_deref())?;
        let email = required("email", self.email.as_deref())?;
        if !email.contains('@') {
            return Err(ApiError::validation(format!("Invalid email: {}", email)));
        }
        Ok((name, email))
    }
}

impl AddMovieRequest {
    pub fn validate(&self) -> Result<NewMovie, ApiError> {
        let title = required("title", self.title.as_deref())?;
        let director = required("director", self.director.as_deref())?;
        let year = self
            .year
            .ok_or_else(|| ApiError::validation("Missing required field: year"))?;
        let rating = self
            .rating
            .ok_or_else(|| ApiError::validation("Missing required field: rating"))?;

        Ok(NewMovie {
            title,
            director,
            year: check_year(year)?,
            rating: check_rating(rating)?,
            poster: optional(self.poster.as_deref()),
        })
    }
}

/// Validate a partial update; blank strings are rejected rather than stored.
pub fn validate_update(update: MovieUpdate) -> Result<MovieUpdate, ApiError> {
    if update.is_empty() {
        return Err(ApiError::validation("No fields to update"));
    }

    let title = match update.title {
        Some(t) => Some(required("title", Some(t.as_str()))?),
        None => None,
    };
    let director = match update.director {
        Some(d) => Some(required("director", Some(d.as_str()))?),
        None => None,
    };

    Ok(MovieUpdate {
        title,
        director,
        year: update.year.map(check_year).transpose()?,
        rating: update.rating.map(check_rating).transpose()?,
        poster: optional(update.poster.as_deref()),
    })
}

impl AddReviewRequest {
    pub fn validate(&self) -> Result<(String, f64), ApiError> {
        let text = required("review_text", self.review_text.as_deref())?;
        let rating = self
            .rating
            .ok_or_else(|| ApiError::validation("Missing required field: rating"))?;
        Ok((text, check_rating(rating)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_validation() {
        let req = CreateUserRequest {
            name: Some(" Ada ".to_string()),
            email: Some("ada@x.com".to_string()),
        };
        assert_eq!(req.validate().unwrap(), ("Ada".to_string(), "ada@x.com".to_string()));

        let req = CreateUserRequest {
            name: Some("Ada".to_string()),
            email: None,
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));

        let req = CreateUserRequest {
            name: Some("Ada".to_string()),
            email: Some("not-an-email".to_string()),
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_add_movie_validation() {
        let req = AddMovieRequest {
            title: Some("Dune".to_string()),
            director: Some("Villeneuve".to_string()),
            year: Some(2021),
            rating: Some(8.0),
            poster: Some("".to_string()),
        };
        let movie = req.validate().unwrap();
        assert_eq!(movie.title, "Dune");
        assert_eq!(movie.poster, None);

        let mut bad = req.clone();
        bad.rating = Some(11.0);
        assert!(bad.validate().is_err());

        let mut bad = req.clone();
        bad.director = Some("  ".to_string());
        assert!(bad.validate().is_err());

        let mut bad = req;
        bad.year = None;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_update() {
        assert!(validate_update(MovieUpdate::default()).is_err());

        let update = validate_update(MovieUpdate {
            year: Some(1984),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(update.year, Some(1984));
        assert_eq!(update.title, None);

        assert!(validate_update(MovieUpdate {
            title: Some("".to_string()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<i32>("year", " 2021 ").unwrap(), 2021);
        assert_eq!(parse_number::<f64>("rating", "7.5").unwrap(), 7.5);
        assert!(parse_number::<i32>("year", "soon").is_err());
    }
}
