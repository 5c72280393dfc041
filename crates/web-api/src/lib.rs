pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use handlers::{HistoryResponse, DEFAULT_HISTORY_LIMIT};
pub use server::ApiServer;
