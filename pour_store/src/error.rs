use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt event row {id}: {detail}")]
    Corrupt { id: i64, detail: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
