/// Errors raised while mapping stored rows back into domain types.
///
/// Store methods return `anyhow::Result`; these variants give corrupt-row
/// failures a stable shape inside that envelope.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A column held a value that no longer parses into its domain enum
    /// (e.g. an unknown metric name written by a newer schema).
    #[error("Storage: corrupt {entity} row: column '{column}' holds {value:?}")]
    Corrupt {
        entity: &'static str,
        column: &'static str,
        value: String,
    },

    /// JSON (de)serialization failure, e.g. the channels column.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
