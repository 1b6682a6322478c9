//! Static assets compiled into the binary

use axum::{
    extract::Path,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

const ASSETS: &[(&str, &str)] = &[
    (
        "js/home.js",
        include_str!("../../web/static/js/home.js"),
    ),
    (
        "css/home.css",
        include_str!("../../web/static/css/home.css"),
    ),
];

fn content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "application/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn lookup(path: &str) -> Option<&'static str> {
    ASSETS
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, body)| *body)
}

pub(super) async fn static_asset(Path(path): Path<String>) -> Result<Response, AppError> {
    let body = lookup(&path).ok_or(AppError::NotFound)?;
    Ok(([(CONTENT_TYPE, content_type(&path))], body).into_response())
}
