//! Depot API server: chunk store, sync protocol, sessions and review gate.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
