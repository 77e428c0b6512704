use serde::Deserialize;

use super::client::LookupError;
use crate::db::NewMovie;

/// Answer of the OMDb `?t=<title>` endpoint. Every value is a string and
/// missing data is spelled "N/A".
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbMovie {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "Director", default)]
    pub director: Option<String>,
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<String>,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "N/A")
}

/// "2019", "2019–2022" and "2019-" all yield 2019.
pub fn parse_year(year: &str) -> Option<i32> {
    let digits: String = year.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    digits.parse().ok()
}

impl OmdbMovie {
    pub fn found(&self) -> bool {
        self.response.eq_ignore_ascii_case("true")
    }

    pub fn into_new_movie(self, query: &str) -> Result<NewMovie, LookupError> {
        if !self.found() {
            return Err(LookupError::NotFound(query.to_string()));
        }

        let title = present(&self.title)
            .ok_or_else(|| LookupError::Invalid(format!("no title for {}", query)))?
            .to_string();
        let year = present(&self.year)
            .and_then(parse_year)
            .ok_or_else(|| LookupError::Invalid(format!("no year for {}", title)))?;
        let director = self
            .director
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or("N/A")
            .to_string();
        let rating = present(&self.imdb_rating)
            .and_then(|r| r.parse::<f64>().ok())
            .unwrap_or(0.0);
        let poster = present(&self.poster).map(str::to_string);

        Ok(NewMovie {
            title,
            director,
            year,
            rating,
            poster,
        })
    }
}
