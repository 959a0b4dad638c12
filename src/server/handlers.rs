use super::AppState;
use crate::directory::ScanMode;
use crate::error::DockinfoError;
use crate::labels::LabelFilter;
use crate::types::{ContainerList, ErrorBody, FilteredPackageList, PackageList};
use serde_json::json;
use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Rejection, Reply};

pub const CONTAINER_NAME_HEADER: &str = "x-container-name";
const CONTAINER_QUERY_PARAM: &str = "container";
const LABEL_QUERY_PARAM: &str = "label";

fn reject(err: DockinfoError) -> Rejection {
    warp::reject::custom(err)
}

/// Percent-decode one path value; Docker names never need escaping but
/// image references in the tail can arrive encoded.
fn decode(raw: &str) -> Result<String, Rejection> {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|_| reject(DockinfoError::invalid_request("Path is not valid UTF-8")))
}

pub async fn health_handler() -> Result<Response, Rejection> {
    Ok(warp::reply::json(&json!({ "status": "healthy" })).into_response())
}

pub async fn container_handler(
    name: String,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let name = decode(&name)?;
    let descriptor = state.resolver.resolve_full(&name).await.map_err(reject)?;
    Ok(warp::reply::json(&descriptor).into_response())
}

pub async fn labels_handler(
    name: String,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let name = decode(&name)?;
    let descriptor = state
        .resolver
        .resolve_labels_only(&name)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&descriptor).into_response())
}

pub async fn image_handler(
    tail: warp::path::Tail,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let reference = decode(tail.as_str())?;
    if reference.is_empty() {
        return Err(warp::reject::not_found());
    }
    let descriptor = state
        .resolver
        .resolve_image(&reference)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&descriptor).into_response())
}

pub async fn self_handler(state: Arc<AppState>) -> Result<Response, Rejection> {
    let descriptor = state
        .resolver
        .resolve_labels_only(&state.self_name)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&descriptor).into_response())
}

/// `/package` and `/my-info`: the caller names itself through a header or
/// a query parameter, header first.
pub async fn caller_handler(
    header: Option<String>,
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let name = header
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .or_else(|| {
            params
                .get(CONTAINER_QUERY_PARAM)
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
        })
        .ok_or_else(|| {
            reject(DockinfoError::invalid_request_with_hint(
                "Container name required",
                "Set X-Container-Name header or container query parameter",
            ))
        })?;

    debug!(container = %name, "Resolving caller");
    let descriptor = state
        .resolver
        .resolve_labels_only(&name)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&descriptor).into_response())
}

pub async fn by_label_handler(
    params: HashMap<String, String>,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let raw = params
        .get(LABEL_QUERY_PARAM)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| {
            reject(DockinfoError::invalid_request(format!(
                "Label filter required (e.g., ?label={}=true)",
                state.labels.enable_key()
            )))
        })?;
    let filter = LabelFilter::parse(raw).map_err(reject)?;

    let packages = state
        .directory
        .list_by_label(&filter, ScanMode::Strict)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&FilteredPackageList {
        filter: raw.clone(),
        count: packages.len(),
        packages,
    })
    .into_response())
}

pub async fn packages_handler(state: Arc<AppState>) -> Result<Response, Rejection> {
    let packages = state
        .directory
        .list_enabled(ScanMode::Lenient)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&PackageList::from(packages)).into_response())
}

pub async fn list_handler(state: Arc<AppState>) -> Result<Response, Rejection> {
    let containers = state
        .directory
        .list_all(ScanMode::Strict)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&ContainerList::from(containers)).into_response())
}

/// Turn every rejection into an `{error, hint?}` body with its status.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, body) = if let Some(e) = err.find::<DockinfoError>() {
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: e.to_string(),
            hint: e.hint().map(str::to_string),
        };
        (status, body)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, message("Not found"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, message("Method not allowed"))
    } else if err.find::<warp::reject::InvalidQuery>().is_some()
        || err.find::<warp::reject::InvalidHeader>().is_some()
    {
        (StatusCode::BAD_REQUEST, message("Malformed request"))
    } else {
        tracing::error!(rejection = ?err, "Unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, message("Internal server error"))
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}

fn message(error: &str) -> ErrorBody {
    ErrorBody {
        error: error.to_string(),
        hint: None,
    }
}
