pub mod auth;
pub mod error;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod counters;
    pub mod health;
    pub mod recipes;
}

pub use error::{ApiError, ApiResult};
pub use router::{create_router, ApiDoc};
pub use types::AppState;
