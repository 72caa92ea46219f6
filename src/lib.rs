// Club Attendance - membership and attendance tracking service

// Attendance analytics - rule evaluation, statistics and streaks
pub mod analytics;

// HTTP layer
pub mod api;
pub mod app_state;

// Domain entities stored as documents
pub mod entities;

// Storage backends, id generation and middleware
pub mod infrastructure;

// Business rules over the store
pub mod services;

// Common utilities
pub mod config;
pub mod data_seeder;
pub mod error;

// Re-exports for convenience
pub use api::create_router;
pub use app_state::AppState;
pub use config::Config;
pub use error::{AppError, AppResult};
