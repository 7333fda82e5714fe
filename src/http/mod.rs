//! HTTP surface over the product service.
//!
//! Routes:
//! - `POST /products` / `POST /products/batch` - create
//! - `GET /products` - list (cached)
//! - `GET /products/:id` - by id (cached)
//! - `GET /products/name/:name` - by name (uncached)
//! - `PUT /products` - update
//! - `DELETE /products/:id` - delete
//! - `GET /cache/stats` - coordinator counters

use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};

use crate::cache::CacheStats;
use crate::database::{NewProduct, Product, StoreError};
use crate::service::{ProductService, ServiceError};

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Store(StoreError::Rejected(_)) => (StatusCode::CONFLICT, "rejected"),
            ServiceError::Store(StoreError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct StatsBody {
    #[serde(flatten)]
    stats: CacheStats,
    hit_rate: f64,
}

type ApiResult<T> = Result<T, ServiceError>;

/// Build the router for `service`.
pub fn router(service: ProductService) -> Router {
    Router::new()
        .route(
            "/products",
            get(list_products).post(create_product).put(update_product),
        )
        .route("/products/batch", post(create_batch))
        .route("/products/name/:name", get(get_product_by_name))
        .route("/products/:id", get(get_product).delete(delete_product))
        .route("/cache/stats", get(cache_stats))
        .with_state(service)
}

/// Serve `service` on `addr` until Ctrl+C.
pub async fn serve(addr: SocketAddr, service: ProductService) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn create_product(
    State(service): State<ProductService>,
    Json(product): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let created = service.create(product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn create_batch(
    State(service): State<ProductService>,
    Json(products): Json<Vec<NewProduct>>,
) -> ApiResult<(StatusCode, Json<Vec<Product>>)> {
    let created = service.create_batch(products).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_products(State(service): State<ProductService>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(service.list().await?))
}

async fn get_product(
    State(service): State<ProductService>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    Ok(Json(service.get_by_id(id).await?))
}

async fn get_product_by_name(
    State(service): State<ProductService>,
    Path(name): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(service.get_by_name(&name).await?))
}

async fn update_product(
    State(service): State<ProductService>,
    Json(product): Json<Product>,
) -> ApiResult<Json<Product>> {
    Ok(Json(service.update(product).await?))
}

async fn delete_product(
    State(service): State<ProductService>,
    Path(id): Path<i64>,
) -> ApiResult<String> {
    service.delete(id).await
}

async fn cache_stats(State(service): State<ProductService>) -> Json<StatsBody> {
    let stats = service.cache_stats();
    Json(StatsBody {
        hit_rate: stats.hit_rate(),
        stats,
    })
}
