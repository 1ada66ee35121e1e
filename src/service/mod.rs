//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services validate input, call into the data layer's transactional
//! operations and fan out notifications after commit.

mod account;
mod follow;
mod notification;
mod post;

pub use account::AccountService;
pub use follow::FollowService;
pub use notification::NotificationService;
pub use post::{CreatePost, PostService};
