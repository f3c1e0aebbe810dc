pub mod auth;
pub mod response;

pub use auth::{session_middleware, Viewer};
pub use response::{ApiResponse, ApiResult};
