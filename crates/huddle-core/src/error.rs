use thiserror::Error;

use crate::MutationId;

/// A fetch that did not produce a value. Carried into `ResourceState::Error`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new("request timed out")
    }
}

impl From<String> for FetchError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for FetchError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Misuse of the store. These point at a UI/state-machine bug, never at the network.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("cannot mutate `{key}` while it is {state}")]
    InvalidState { key: String, state: &'static str },
    #[error("mutation {id} is not pending on `{key}`")]
    MutationConflict { key: String, id: MutationId },
    #[error("`{key}` holds a value of a different type")]
    TypeMismatch { key: String },
}
