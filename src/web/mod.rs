//! Browser-facing pages
//!
//! The home page and the static assets it loads. Both are public; the
//! page itself asks the API for data and shows a login link on 401.

mod assets;
mod home;

use axum::{Router, routing::get};

use crate::AppState;

/// Create web router
///
/// Routes:
/// - GET / - Home page
/// - GET /static/*path - Embedded JS/CSS
pub fn web_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home_page))
        .route("/static/*path", get(assets::static_asset))
}
