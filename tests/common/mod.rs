#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use movieweb::db::{NewMovie, SqliteRepository};
use movieweb::omdb::{LookupError, MovieLookup};
use movieweb::pages::Views;
use movieweb::server::{build_router, AppState};

/// Knows exactly one movie; anything else is "not found".
pub struct FakeLookup;

#[async_trait]
impl MovieLookup for FakeLookup {
    async fn lookup(&self, title: &str) -> Result<NewMovie, LookupError> {
        match title {
            "Dune" => Ok(NewMovie {
                title: "Dune".to_string(),
                director: "Denis Villeneuve".to_string(),
                year: 2021,
                rating: 8.0,
                poster: Some("https://img.example/dune.jpg".to_string()),
            }),
            "Offline" => Err(LookupError::Invalid("upstream went away".to_string())),
            other => Err(LookupError::NotFound(other.to_string())),
        }
    }
}

pub async fn app() -> Router {
    let db = Arc::new(SqliteRepository::new("sqlite::memory:").await.unwrap());
    let views = Arc::new(Views::new().unwrap());
    build_router(AppState::new(db, Arc::new(FakeLookup), views))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

pub async fn json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn form(app: &Router, uri: &str, body: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, location, String::from_utf8_lossy(&bytes).to_string())
}
