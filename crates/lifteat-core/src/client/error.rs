use thiserror::Error;

use crate::cache::QueryKey;
use crate::category::DataCategory;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Network unavailable - query {0} paused until reconnect")]
    Offline(QueryKey),

    #[error("Fetch failed for {key} after {attempts} attempt(s): {message}")]
    Fetch {
        key: QueryKey,
        attempts: u32,
        message: String,
    },

    #[error("Query {key} is tagged {existing}, cannot reuse it as {requested}")]
    CategoryConflict {
        key: QueryKey,
        existing: DataCategory,
        requested: DataCategory,
    },

    #[error("Failed to encode data for {0}: {1}")]
    Encode(QueryKey, String),

    #[error("Failed to decode cached data for {0}: {1}")]
    Decode(QueryKey, String),
}

impl QueryError {
    pub fn is_offline(&self) -> bool {
        matches!(self, QueryError::Offline(_))
    }
}
