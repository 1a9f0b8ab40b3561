use std::sync::Arc;

use crate::{
    api::origin::require_origin,
    error::{ApiError, ApiResult},
    main_lib::AppState,
    models::{CompanyDto, CompanyListQuery},
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tokio::task;
use xm_core::companies::{Company, CompanyInput};
use xm_core::constants::{ERROR_CODE_EMPTY_REQUEST_BODY, ERROR_CODE_INVALID_JSON};
use xm_core::errors::ValidationError;
use xm_core::events::DomainEvent;
use xm_messaging::{DispatchOutcome, Dispatcher, QueueCommand};
use xm_storage_sqlite::companies::{filter_by, order_by_name};
use xm_storage_sqlite::{DbTransactionExecutor, Repository, UnitOfWork};

/// Decodes a JSON request body, reporting an empty body and malformed JSON
/// as payload validation errors.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> xm_core::Result<T> {
    if body.is_empty() {
        return Err(ValidationError::InvalidRequestPayload(
            ERROR_CODE_EMPTY_REQUEST_BODY.to_string(),
        )
        .into());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        ValidationError::InvalidRequestPayload(ERROR_CODE_INVALID_JSON.to_string()).into()
    })
}

/// Runs a storage operation on the blocking pool. Write scopes can wait on
/// the SQLite lock for up to the busy timeout.
async fn blocking<T, F>(op: F) -> ApiResult<T>
where
    F: FnOnce() -> xm_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(op)
        .await
        .map_err(|e| ApiError::Internal(format!("Storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Hands a committed change to the dispatcher. The write is already durable,
/// so a rejected dispatch is only logged.
async fn notify(state: &AppState, event: DomainEvent) {
    let routing_key = event.routing_key();
    match state.dispatcher.dispatch(QueueCommand::from(event)).await {
        Ok(DispatchOutcome::Enqueued) => {}
        Ok(DispatchOutcome::Dropped) => {
            tracing::warn!("Event '{}' dropped by the dispatcher", routing_key)
        }
        Err(e) => tracing::error!("Event '{}' not dispatched: {}", routing_key, e),
    }
}

async fn list_companies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompanyListQuery>,
) -> ApiResult<Json<Vec<CompanyDto>>> {
    let filters = query.filters();
    let companies = blocking(move || {
        let mut processors: Vec<_> = filters.into_iter().map(filter_by).collect();
        processors.push(order_by_name());

        let mut uow = UnitOfWork::begin(&state.pool, true)?;
        state.company_repository.get_all(&mut uow, processors)
    })
    .await?;
    Ok(Json(companies.into_iter().map(CompanyDto::from).collect()))
}

async fn get_company(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<CompanyDto>> {
    let company = blocking(move || {
        let mut uow = UnitOfWork::begin(&state.pool, true)?;
        state.company_repository.get(&mut uow, &id)
    })
    .await?;
    Ok(Json(CompanyDto::from(company)))
}

async fn create_company(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CompanyDto>)> {
    let dto: CompanyDto = parse_body(&body)?;
    let company = Company::new(CompanyInput::from(dto))?;

    let storage = state.clone();
    let stored = blocking(move || {
        storage
            .pool
            .execute(|uow| storage.company_repository.add(uow, &company))
    })
    .await?;
    tracing::info!("Company {} created", stored.id);

    notify(&state, DomainEvent::company_created(stored.clone())).await;
    Ok((StatusCode::CREATED, Json(CompanyDto::from(stored))))
}

async fn update_company(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<CompanyDto>> {
    let storage = state.clone();
    let updated = blocking(move || {
        storage.pool.execute(|uow| {
            let mut company = storage.company_repository.get(uow, &id)?;
            let dto: CompanyDto = parse_body(&body)?;
            company.apply(CompanyInput::from(dto))?;
            storage.company_repository.update(uow, &company)
        })
    })
    .await?;
    tracing::info!("Company {} updated", updated.id);

    notify(&state, DomainEvent::company_updated(updated.clone())).await;
    Ok(Json(CompanyDto::from(updated)))
}

async fn delete_company(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    let storage = state.clone();
    let target = id.clone();
    blocking(move || {
        storage.pool.execute(|uow| {
            let company = storage.company_repository.get(uow, &target)?;
            storage.company_repository.delete(uow, &company, Vec::new())
        })
    })
    .await?;
    tracing::info!("Company {} deleted", id);

    notify(&state, DomainEvent::company_deleted(id)).await;
    Ok(Json(serde_json::Value::Null))
}

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/companies",
            post(create_company)
                .route_layer(from_fn_with_state(state.clone(), require_origin))
                .get(list_companies),
        )
        .route(
            "/companies/{id}",
            delete(delete_company)
                .route_layer(from_fn_with_state(state, require_origin))
                .get(get_company)
                .put(update_company),
        )
}
