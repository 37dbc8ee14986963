use std::rc::Rc;

use smallvec::SmallVec;
use web_time::Instant;

use crate::MutationId;

pub type PendingIds = SmallVec<[MutationId; 4]>;

/// The state of one remote-backed value.
///
/// `Loading` and `Error` carry the best value seen so far so a screen can keep
/// showing last-known content while refreshing or after a failure. Values are
/// shared snapshots: a transition always publishes a new `Rc`, never writes
/// through an existing one.
#[derive(Debug, PartialEq)]
pub enum ResourceState<T> {
    /// No fetch attempted yet.
    Idle,
    Loading {
        previous: Option<Rc<T>>,
    },
    Success {
        value: Rc<T>,
        fetched_at: Instant,
        /// Optimistic mutations applied on top of the fetched value, oldest first.
        pending: PendingIds,
    },
    Error {
        message: String,
        last_known: Option<Rc<T>>,
    },
}

impl<T> ResourceState<T> {
    pub fn success(value: T, fetched_at: Instant) -> Self {
        Self::Success {
            value: Rc::new(value),
            fetched_at,
            pending: SmallVec::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Best available value for any tag.
    pub fn value(&self) -> Option<&Rc<T>> {
        match self {
            Self::Idle => None,
            Self::Loading { previous } => previous.as_ref(),
            Self::Success { value, .. } => Some(value),
            Self::Error { last_known, .. } => last_known.as_ref(),
        }
    }

    pub fn pending(&self) -> &[MutationId] {
        match self {
            Self::Success { pending, .. } => pending,
            _ => &[],
        }
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        match self {
            Self::Success { fetched_at, .. } => Some(*fetched_at),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Success { .. } => "success",
            Self::Error { .. } => "error",
        }
    }
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading { previous } => Self::Loading {
                previous: previous.clone(),
            },
            Self::Success {
                value,
                fetched_at,
                pending,
            } => Self::Success {
                value: value.clone(),
                fetched_at: *fetched_at,
                pending: pending.clone(),
            },
            Self::Error {
                message,
                last_known,
            } => Self::Error {
                message: message.clone(),
                last_known: last_known.clone(),
            },
        }
    }
}
