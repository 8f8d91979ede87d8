use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection unavailable: {0}")]
    Pool(String),

    #[error("store query failed: {0}")]
    Query(#[from] diesel::result::Error),

    /// A stored JSON document did not match its expected shape
    #[error("corrupt {entity} record: {source}")]
    Corrupt {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
