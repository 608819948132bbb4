//! HTTP control surface under `/api/v1`
//!
//! Every JSON answer is wrapped in an [`Envelope`]. Task collection
//! endpoints share one query grammar ([`TaskQuery`]) for filtering and
//! pagination.

pub mod auth;
mod error;
pub mod extract;
pub mod models;
pub mod pagination;
pub mod query;
pub mod relay;
pub mod result;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;

pub use error::{ApiError, RawError};
pub use pagination::PageRequest;
pub use query::TaskQuery;
pub use result::{Envelope, RespCode, digest};
pub use server::{router, run};
pub use state::AppState;
