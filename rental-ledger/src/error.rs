use rental_client::StoreError;

#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
    #[error("allocation error: {0}")]
    Allocation(String),
    #[error("import format error: {0}")]
    ImportFormat(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
