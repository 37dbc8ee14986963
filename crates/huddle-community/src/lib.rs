//! Community, feed and room resources for Huddle screens.
//!
//! Screens never call the backend directly. They get a [`CommunityRepository`]
//! and subscribe to what they show:
//!
//! ```ignore
//! let repo = CommunityRepository::new(store, backend);
//! repo.feed("c1", FetchOptions::default(), move |state| render_feed(state))
//!     .bind(&screen_scope);
//!
//! // on tap
//! repo.toggle_like("c1", &post.id)?;
//! ```

pub mod backend;
pub mod keys;
pub mod models;
pub mod mutations;
pub mod repository;

pub use backend::{ApiFuture, Backend};
pub use models::*;
pub use repository::CommunityRepository;
