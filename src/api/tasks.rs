//! Lateness report endpoint

use axum::{Json, Router, extract::State, routing::get};

use crate::AppState;
use crate::auth::CurrentSession;
use crate::error::AppError;
use crate::service::{LateTask, lateness_report};

/// Create tasks router
///
/// Routes:
/// - GET /tasks - Completed tasks and how late each was finished
pub fn tasks_router() -> Router<AppState> {
    Router::new().route("/tasks", get(list_late_tasks))
}

/// GET /api/v1/tasks
async fn list_late_tasks(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<Vec<LateTask>>, AppError> {
    let access_token = session.access_token().ok_or(AppError::Unauthorized)?;

    let tasks = state.tasks.completed_tasks(access_token).await?;
    let report = lateness_report(&tasks);

    tracing::debug!(
        completed = tasks.len(),
        reported = report.len(),
        "Built lateness report"
    );

    Ok(Json(report))
}
