// Blog entities.
// Posts and the comments attached to them.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{FolioError, Result};

use super::tags::TagSet;

/// Text layout of timestamps in the database and JSON views.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| FolioError::Other(format!("invalid timestamp '{}': {}", text, e)))
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(dt))
    }
}

/// A comment left on a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub uid: String,
    pub author: String,
    pub title: String,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub edited: NaiveDateTime,
}

impl Comment {
    pub fn new(
        author: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let created = now();
        Self {
            uid: Uuid::new_v4().to_string(),
            author: author.into(),
            title: title.into(),
            content: content.into(),
            created,
            edited: created,
        }
    }

    pub fn is_edited(&self) -> bool {
        self.edited != self.created
    }

    /// Mark the comment as edited now.
    pub fn touch(&mut self) {
        self.edited = now();
    }
}

/// A blog post with its tags and comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub uid: String,
    pub title: String,
    pub content: String,
    pub tags: TagSet,
    #[serde(with = "timestamp")]
    pub created: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub edited: NaiveDateTime,
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn new(title: impl Into<String>, content: impl Into<String>, tags: TagSet) -> Self {
        let created = now();
        Self {
            uid: Uuid::new_v4().to_string(),
            title: title.into(),
            content: content.into(),
            tags,
            created,
            edited: created,
            comments: Vec::new(),
        }
    }

    pub fn is_edited(&self) -> bool {
        self.edited != self.created
    }

    pub fn touch(&mut self) {
        self.edited = now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip() {
        let dt = parse_timestamp("2024-03-09 17:45:01.123456").unwrap();
        assert_eq!(format_timestamp(&dt), "2024-03-09 17:45:01.123456");
        assert!(parse_timestamp("2024-03-09T17:45:01").is_err());
    }

    #[test]
    fn test_new_post_is_unedited() {
        let mut post = Post::new("Hello", "First post", TagSet::empty());
        assert!(!post.is_edited());
        assert_eq!(post.uid.len(), 36);

        post.edited = post.created + chrono::Duration::seconds(5);
        assert!(post.is_edited());
    }

    #[test]
    fn test_post_json_view() {
        let mut post = Post::new(
            "Weather station",
            "Notes",
            TagSet::encode(&["esp32", "iot"]).unwrap(),
        );
        post.created = parse_timestamp("2024-01-02 03:04:05.000006").unwrap();
        post.comments.push(Comment::new("reader", "Nice", "Great write-up"));

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["tags"], serde_json::json!(["iot", "esp32"]));
        assert_eq!(json["created"], "2024-01-02 03:04:05.000006");
        assert_eq!(json["comments"][0]["author"], "reader");
    }
}
