pub mod auth;
pub mod response;

pub use auth::{bearer_token, require, GuardState, PIN_HEADER, PIN_QUERY_PARAM};
pub use response::{ApiResponse, ApiResult};
