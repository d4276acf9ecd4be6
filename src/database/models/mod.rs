pub mod post;
pub mod user;

pub use post::{NewPost, Post, PostChanges, PostRow, PostStatus, DEFAULT_POST_TITLE};
pub use user::User;
