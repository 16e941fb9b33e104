pub mod routes;

// Re-export route handlers for convenience
pub use routes::categories;
pub use routes::products;
pub use routes::state::AppState;
pub use routes::stores;
