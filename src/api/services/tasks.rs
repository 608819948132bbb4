use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use super::require_id;
use crate::api::error::{ApiError, RawError};
use crate::api::extract::ApiJson;
use crate::api::models::{CreateTask, CreateTaskBatch, TaskPage};
use crate::api::query::TaskQuery;
use crate::api::result::Envelope;
use crate::api::state::AppState;
use crate::engine::{Request, ResolveResult, Task, TaskFilter};

/// POST /api/v1/resolve
pub async fn resolve(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Request>,
) -> Result<Envelope<ResolveResult>, ApiError> {
    let result = state.engine.resolve(req).await?;
    debug!(rid = %result.id, name = %result.res.name, "Resolved request");
    Ok(Envelope::ok(result))
}

/// POST /api/v1/tasks
///
/// A non-empty `rid` takes precedence; otherwise `req` is resolved and
/// created in one step.
pub async fn create_task(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateTask>,
) -> Result<Envelope<String>, ApiError> {
    let opts = body.opt.unwrap_or_default();

    let task_id = if !body.rid.is_empty() {
        state.engine.create(&body.rid, opts).await?
    } else if let Some(req) = body.req {
        state.engine.create_direct(req, opts).await?
    } else {
        return Err(ApiError::param("rid or req"));
    };

    state.metrics.tasks_created(1);

    Ok(Envelope::ok(task_id))
}

/// POST /api/v1/tasks/batch
pub async fn create_task_batch(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateTaskBatch>,
) -> Result<Envelope<Vec<String>>, ApiError> {
    if body.reqs.is_empty() {
        return Err(ApiError::param("reqs"));
    }

    let requested = body.reqs.len();
    let task_ids = state
        .engine
        .create_direct_batch(body.reqs, body.opt.unwrap_or_default())
        .await?;

    state.metrics.tasks_created(task_ids.len() as u64);
    info!(requested, created = task_ids.len(), "Task batch created");

    Ok(Envelope::ok(task_ids))
}

/// PUT /api/v1/tasks/{id}/pause
pub async fn pause_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let filter = TaskFilter::by_id(require_id(id)?);
    state.engine.pause(&filter).await?;
    Ok(Envelope::nil())
}

/// PUT /api/v1/tasks/pause
pub async fn pause_tasks(
    State(state): State<AppState>,
    query: TaskQuery,
) -> Result<Envelope<()>, ApiError> {
    state.engine.pause(&query.filter).await?;
    Ok(Envelope::nil())
}

/// PUT /api/v1/tasks/{id}/continue
pub async fn continue_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    let filter = TaskFilter::by_id(require_id(id)?);
    state.engine.resume(&filter).await?;
    Ok(Envelope::nil())
}

/// PUT /api/v1/tasks/continue
pub async fn continue_tasks(
    State(state): State<AppState>,
    query: TaskQuery,
) -> Result<Envelope<()>, ApiError> {
    state.engine.resume(&query.filter).await?;
    Ok(Envelope::nil())
}

/// DELETE /api/v1/tasks/{id}?force=true
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: TaskQuery,
) -> Result<Envelope<()>, ApiError> {
    let filter = TaskFilter::by_id(require_id(id)?);
    delete_matching(&state, &filter, query.force).await
}

/// DELETE /api/v1/tasks?force=true
pub async fn delete_tasks(
    State(state): State<AppState>,
    query: TaskQuery,
) -> Result<Envelope<()>, ApiError> {
    delete_matching(&state, &query.filter, query.force).await
}

async fn delete_matching(
    state: &AppState,
    filter: &TaskFilter,
    force: bool,
) -> Result<Envelope<()>, ApiError> {
    state.engine.delete(filter, force).await?;
    state.metrics.task_delete_requested();
    debug!(ids = ?filter.ids, force, "Delete applied");
    Ok(Envelope::nil())
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Envelope<Task>, ApiError> {
    let id = require_id(id)?;
    let task = state
        .engine
        .get_task(&id)
        .await
        .ok_or(ApiError::TaskNotFound)?;
    Ok(Envelope::ok(task))
}

/// GET /api/v1/tasks?status=running&page=2&pageSize=10
pub async fn get_tasks(
    State(state): State<AppState>,
    query: TaskQuery,
) -> Result<Envelope<TaskPage>, ApiError> {
    let tasks = state.engine.get_tasks(&query.filter).await;
    Ok(Envelope::ok(query.page.paginate(tasks)))
}

/// GET /api/v1/tasks/{id}/stats
///
/// Engine failures are answered with a plain text 500, not an envelope.
pub async fn get_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = require_id(id)?;
    match state.engine.stats(&id).await {
        Ok(stats) => Ok(Envelope::ok(stats).into_response()),
        Err(err) => Ok(RawError(err.to_string()).into_response()),
    }
}
