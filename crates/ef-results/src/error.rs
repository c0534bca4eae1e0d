use std::path::PathBuf;

use thiserror::Error;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(Error, Debug)]
pub enum ResultsError {
    #[error("Value out of range: {what}")]
    OutOfRange { what: String },

    #[error("Missing field: {field}")]
    MissingField { field: String },

    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("File system error at {path}: {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed document: {source}")]
    Malformed { source: serde_json::Error },

    #[error("Csv error: {source}")]
    Csv { source: csv::Error },

    #[error("Invalid data: {what}")]
    InvalidData { what: String },
}

/// Split serde_json's structural failures into the typed kinds callers
/// pattern-match on.
pub(crate) fn classify_json_error(source: serde_json::Error) -> ResultsError {
    let message = source.to_string();
    if let Some(rest) = message.strip_prefix("unknown field `") {
        let field = rest.split('`').next().unwrap_or_default().to_string();
        return ResultsError::UnknownField { field };
    }
    if let Some(rest) = message.strip_prefix("missing field `") {
        let field = rest.split('`').next().unwrap_or_default().to_string();
        return ResultsError::MissingField { field };
    }
    ResultsError::Malformed { source }
}
