//! Entity route handlers
//!
//! Every handler takes the [`RequestContext`] built by the context middleware
//! and goes through its handles. None of them sees a tenant id.

use axum::Json;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use futures::TryStreamExt;
use serde::Deserialize;
use tenant_scope::{
    DataHandle, EntityName, NewRecord, PROJECT, Predicate, Record, RecordId, RequestContext, TASK,
};

use crate::Result;

/// Query string accepted by `GET /tasks`
#[derive(Debug, Default, Deserialize)]
pub struct TaskFilter {
    pub project_id: Option<u64>,
}

impl TaskFilter {
    fn predicate(&self) -> Predicate {
        self.project_id
            .map_or(Predicate::All, |id| Predicate::field_eq("project_id", id))
    }
}

pub async fn list_projects(
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<Record>>> {
    list(&ctx, PROJECT, Predicate::All).await.map(Json)
}

pub async fn create_project(
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewRecord>,
) -> Result<(StatusCode, Json<Record>)> {
    create(&ctx, PROJECT, body).await
}

pub async fn get_project(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<u64>,
) -> Result<Json<Record>> {
    get(&ctx, PROJECT, RecordId::new(id)).await.map(Json)
}

pub async fn delete_project(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    delete(&ctx, PROJECT, RecordId::new(id)).await
}

pub async fn list_tasks(
    Extension(ctx): Extension<RequestContext>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<Record>>> {
    list(&ctx, TASK, filter.predicate()).await.map(Json)
}

pub async fn create_task(
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewRecord>,
) -> Result<(StatusCode, Json<Record>)> {
    create(&ctx, TASK, body).await
}

pub async fn get_task(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<u64>,
) -> Result<Json<Record>> {
    get(&ctx, TASK, RecordId::new(id)).await.map(Json)
}

pub async fn delete_task(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    delete(&ctx, TASK, RecordId::new(id)).await
}

async fn list(
    ctx: &RequestContext,
    entity: EntityName,
    predicate: Predicate,
) -> Result<Vec<Record>> {
    let handle = ctx.handle(entity)?;
    let records = track(entity, "find", collect(handle.as_ref(), predicate).await)?;
    Ok(records)
}

async fn collect(
    handle: &dyn DataHandle,
    predicate: Predicate,
) -> tenant_scope::Result<Vec<Record>> {
    handle.find_where(predicate).await?.try_collect().await
}

async fn create(
    ctx: &RequestContext,
    entity: EntityName,
    body: NewRecord,
) -> Result<(StatusCode, Json<Record>)> {
    let handle = ctx.handle(entity)?;
    let record = track(entity, "save", handle.save(body).await)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get(ctx: &RequestContext, entity: EntityName, id: RecordId) -> Result<Record> {
    let handle = ctx.handle(entity)?;
    Ok(track(entity, "find_by_id", handle.find_by_id(id).await)?)
}

async fn delete(ctx: &RequestContext, entity: EntityName, id: RecordId) -> Result<StatusCode> {
    let handle = ctx.handle(entity)?;
    track(entity, "delete", handle.delete(id).await)?;
    Ok(StatusCode::NO_CONTENT)
}

fn track<T>(
    entity: EntityName,
    op: &'static str,
    result: tenant_scope::Result<T>,
) -> tenant_scope::Result<T> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) if e.is_not_found() => "not_found",
        Err(e) if e.is_invalid_record() => "invalid",
        Err(_) => "error",
    };
    tracing::debug!(entity = %entity, op, outcome, "handle operation");

    #[cfg(feature = "metrics")]
    crate::observability::record_handle_op(entity.as_str(), op, outcome);

    result
}
