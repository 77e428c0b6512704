use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tera::{Context, Tera};
use tracing::error;

use crate::api::ApiError;
use crate::server::AppState;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("users.html", include_str!("../../templates/users.html")),
    ("add_user.html", include_str!("../../templates/add_user.html")),
    ("user_movies.html", include_str!("../../templates/user_movies.html")),
    ("add_movie.html", include_str!("../../templates/add_movie.html")),
    ("update_movie.html", include_str!("../../templates/update_movie.html")),
    ("delete_movie.html", include_str!("../../templates/delete_movie.html")),
    ("add_review.html", include_str!("../../templates/add_review.html")),
    ("user_reviews.html", include_str!("../../templates/user_reviews.html")),
    ("display_review.html", include_str!("../../templates/display_review.html")),
    ("movie_reviews.html", include_str!("../../templates/movie_reviews.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

/// Page templates, compiled once at startup.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<Html<String>, ApiError> {
        Ok(Html(self.tera.render(name, context)?))
    }

    pub fn render_error(&self, err: &ApiError) -> Response {
        let status = err.status();
        let mut context = Context::new();
        context.insert("status", &status.as_u16());
        context.insert("reason", status.canonical_reason().unwrap_or("Error"));
        context.insert("message", &err.to_string());

        match self.tera.render("error.html", &context) {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                error!(error = ?e, "Failed to render error page");
                (status, err.to_string()).into_response()
            }
        }
    }
}

/// Error from a page handler, rendered as an HTML error page.
pub struct PageError {
    views: Arc<Views>,
    error: ApiError,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        self.views.render_error(&self.error)
    }
}

pub type PageResult = Result<Response, PageError>;

pub trait OrPage<T> {
    fn or_page(self, state: &AppState) -> Result<T, PageError>;
}

impl<T, E: Into<ApiError>> OrPage<T> for Result<T, E> {
    fn or_page(self, state: &AppState) -> Result<T, PageError> {
        self.map_err(|e| PageError {
            views: state.views.clone(),
            error: e.into(),
        })
    }
}

/// Build a template context from a serializable value.
pub fn context<T: Serialize>(value: &T) -> Result<Context, ApiError> {
    Ok(Context::from_serialize(value)?)
}

/// Render a page with the given status code.
pub fn page(state: &AppState, status: StatusCode, name: &str, context: &Context) -> PageResult {
    let html = state.views.render(name, context).or_page(state)?;
    Ok((status, html).into_response())
}
