//! HTTP surface.
//!
//! Every route is a warp filter. Failures travel as rejections carrying a
//! [`DockinfoError`] and are shaped into JSON by [`handlers::handle_rejection`].
//! CORS headers are applied to the finished response, after recovery, so error
//! bodies carry them too.

pub mod handlers;

use crate::config::Settings;
use crate::cors::OriginPolicy;
use crate::directory::Directory;
use crate::error::{DockinfoError, Result};
use crate::labels::LabelNamespace;
use crate::monitoring::log_api_request;
use crate::resolver::Resolver;
use crate::runtime::RuntimeClient;
use handlers::CONTAINER_NAME_HEADER;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use warp::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ORIGIN, VARY,
};
use warp::http::{HeaderMap, HeaderValue, Method, StatusCode};
use warp::reply::Response;
use warp::{Filter, Reply};

impl warp::reject::Reject for DockinfoError {}

/// Everything a handler needs, shared across requests
pub struct AppState {
    pub resolver: Resolver,
    pub directory: Directory,
    pub labels: LabelNamespace,
    pub self_name: String,
}

impl AppState {
    pub fn new(client: Arc<RuntimeClient>, labels: LabelNamespace, self_name: String) -> Self {
        Self {
            resolver: Resolver::new(client.clone(), labels.clone()),
            directory: Directory::new(client, labels.clone()),
            labels,
            self_name,
        }
    }
}

/// Read-only HTTP server over the shared runtime client
pub struct ApiServer {
    state: Arc<AppState>,
    cors: Option<Arc<OriginPolicy>>,
    bind_address: SocketAddr,
}

impl ApiServer {
    pub fn new(client: Arc<RuntimeClient>, settings: &Settings) -> Self {
        Self {
            state: Arc::new(AppState::new(
                client,
                settings.labels.clone(),
                settings.self_name.clone(),
            )),
            cors: settings.cors.clone().map(Arc::new),
            bind_address: settings.bind,
        }
    }

    pub fn with_address(mut self, bind_address: SocketAddr) -> Self {
        self.bind_address = bind_address;
        self
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + Send + Sync + 'static
    {
        routes(self.state.clone(), self.cors.clone())
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("🌐 Starting dockinfo API on http://{}", self.bind_address);

        let (addr, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(self.bind_address, shutdown)
            .map_err(|e| DockinfoError::Bind {
                addr: self.bind_address,
                reason: e.to_string(),
            })?;

        info!("✅ dockinfo listening on http://{}", addr);
        server.await;
        info!("🛑 dockinfo API stopped");
        Ok(())
    }
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// The full filter tree: API routes, preflight, rejection recovery, CORS
/// and request logging.
pub fn routes(
    state: Arc<AppState>,
    cors: Option<Arc<OriginPolicy>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone + Send + Sync + 'static {
    let health = warp::path!("health")
        .and(warp::get())
        .and_then(handlers::health_handler);

    let container = warp::path!("container" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::container_handler);

    let package_by_name = warp::path!("package" / String)
        .or(warp::path!("labels" / String))
        .unify()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::labels_handler);

    let image = warp::path("image")
        .and(warp::path::tail())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::image_handler);

    let own = warp::path!("self")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::self_handler);

    let caller = warp::path!("package")
        .or(warp::path!("my-info"))
        .unify()
        .and(warp::get())
        .and(warp::header::optional::<String>(CONTAINER_NAME_HEADER))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(handlers::caller_handler);

    let by_label = warp::path!("by-label")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(handlers::by_label_handler);

    let packages = warp::path!("packages")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handlers::packages_handler);

    let list = warp::path!("list")
        .and(warp::get())
        .and(with_state(state))
        .and_then(handlers::list_handler);

    // Other methods reject as not-found so unknown paths stay 404.
    let preflight = warp::method().and_then(|method: Method| async move {
        if method == Method::OPTIONS {
            Ok(StatusCode::NO_CONTENT.into_response())
        } else {
            Err(warp::reject::not_found())
        }
    });

    let api = preflight
        .or(health)
        .unify()
        .or(container)
        .unify()
        .or(package_by_name)
        .unify()
        .or(image)
        .unify()
        .or(own)
        .unify()
        .or(caller)
        .unify()
        .or(by_label)
        .unify()
        .or(packages)
        .unify()
        .or(list)
        .unify()
        .recover(handlers::handle_rejection)
        .unify();

    warp::header::headers_cloned()
        .and(warp::method())
        .and(api)
        .map(move |headers: HeaderMap, method: Method, response: Response| {
            apply_cors(response, &headers, &method, cors.as_deref())
        })
        .with(warp::log::custom(|info| {
            log_api_request(
                info.method().as_str(),
                info.path(),
                info.status().as_u16(),
                info.elapsed().as_secs_f64() * 1000.0,
            )
        }))
}

/// Decorate `response` for an allowed origin. Disallowed or absent origins
/// leave it untouched.
pub fn apply_cors(
    mut response: Response,
    request_headers: &HeaderMap,
    method: &Method,
    policy: Option<&OriginPolicy>,
) -> Response {
    let Some(policy) = policy else {
        return response;
    };
    let Some(origin) = request_headers.get(ORIGIN) else {
        return response;
    };
    if !policy.is_allowed(origin.to_str().ok()) {
        return response;
    }

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    if method == Method::OPTIONS {
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        if let Some(requested) = request_headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
    }
    response
}
