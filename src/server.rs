use axum::{
    http::StatusCode,
    routing::{get, patch, put},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::api::{self, AppState};
use crate::database::Database;
use crate::error::StorefrontError;

pub struct WebServer {
    host: String,
    port: u16,
    db: Database,
}

impl WebServer {
    pub fn new(host: String, port: u16, db: Database) -> Self {
        Self { host, port, db }
    }

    pub async fn start(&self) -> Result<(), StorefrontError> {
        let app = self.create_router();

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| StorefrontError::Error(format!("Invalid address: {}", e)))?;

        println!("Storefront server starting on http://{}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| StorefrontError::Error(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("Server ready to handle requests on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
                log::info!("Shutdown signal received, stopping server");
                println!("\nShutdown signal received - stopping server gracefully...");
            })
            .await
            .map_err(|e| StorefrontError::Error(format!("Server error: {}", e)))?;

        log::info!("Server shutdown complete");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let app_state = AppState::new(self.db.clone());

        Router::new()
            // Health check
            .route("/health", get(health_check))

            // Product endpoints
            .route("/api/products", get(api::products::list_products))
            .route("/api/products/featured", get(api::products::get_featured_products))
            .route("/api/products/count", get(api::products::get_product_count))
            .route("/api/products/search", get(api::products::search_products))
            .route("/api/products/{id}", get(api::products::get_product))
            .route("/api/products/{id}/rating", patch(api::products::update_product_rating))

            // Store endpoints
            .route(
                "/api/stores",
                get(api::stores::list_stores).post(api::stores::create_store),
            )
            .route(
                "/api/stores/{id}",
                get(api::stores::get_store).put(api::stores::update_store),
            )
            .route(
                "/api/stores/{id}/products",
                get(api::stores::list_store_products).post(api::stores::create_product),
            )
            .route(
                "/api/stores/{id}/products/{product_id}",
                put(api::stores::update_product).delete(api::stores::delete_product),
            )

            // Category endpoints
            .route("/api/categories", get(api::categories::list_categories))
            .route(
                "/api/categories/{id}/subcategories",
                get(api::categories::list_subcategories_by_category),
            )
            .route("/api/subcategories", get(api::categories::list_subcategories))

            // Add state for handlers
            .with_state(app_state)
    }
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Waits for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            log::info!("Received SIGTERM");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, StatusCode::OK);
    }

    #[test]
    fn test_router_builds() {
        let db = Database::open_in_memory().unwrap();
        let server = WebServer::new("127.0.0.1".into(), 0, db);
        let _router = server.create_router();
    }
}
