// Blog module.
// Post and comment storage over an embedded SQLite database, plus tag encoding.

pub mod database;
pub mod entities;
pub mod schema;
pub mod services;
pub mod tags;

pub use database::Database;
pub use entities::{Comment, Post};
pub use services::{CommentService, PostService};
pub use tags::TagSet;
