use idflow_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Profile storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ManagerError>;
