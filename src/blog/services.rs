// Post and comment services.
// Parameterized CRUD over the blogposts and comments tables.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, error};

use crate::error::Result;

use super::database::Database;
use super::entities::{Comment, Post, format_timestamp, parse_timestamp};
use super::tags::TagSet;

const POST_COLUMNS: &str = "uid, title, content, created, modified, tags";
const COMMENT_COLUMNS: &str = "uid, author, title, content, created, edited";

/// Raw post row before timestamp and tag parsing.
struct PostRow {
    uid: String,
    title: String,
    content: String,
    created: String,
    modified: String,
    tags: String,
}

impl PostRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created: row.get(3)?,
            modified: row.get(4)?,
            tags: row.get(5)?,
        })
    }

    fn into_post(self, comments: Vec<Comment>) -> Result<Post> {
        Ok(Post {
            created: parse_timestamp(&self.created)?,
            edited: parse_timestamp(&self.modified)?,
            tags: TagSet::from_bit_string(&self.tags)?,
            uid: self.uid,
            title: self.title,
            content: self.content,
            comments,
        })
    }
}

struct CommentRow {
    uid: String,
    author: String,
    title: String,
    content: String,
    created: String,
    edited: String,
}

impl CommentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: row.get(0)?,
            author: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created: row.get(4)?,
            edited: row.get(5)?,
        })
    }

    fn into_comment(self) -> Result<Comment> {
        Ok(Comment {
            created: parse_timestamp(&self.created)?,
            edited: parse_timestamp(&self.edited)?,
            uid: self.uid,
            author: self.author,
            title: self.title,
            content: self.content,
        })
    }
}

fn query_comments(conn: &Connection, post_uid: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM comments WHERE post_uid = ?1 ORDER BY created DESC",
        COMMENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([post_uid], CommentRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(CommentRow::into_comment).collect()
}

fn insert_comment(conn: &Connection, post_uid: &str, comment: &Comment) -> Result<()> {
    conn.prepare_cached("INSERT INTO comments VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")?
        .execute(params![
            comment.uid,
            post_uid,
            comment.author,
            comment.title,
            comment.content,
            format_timestamp(&comment.created),
            format_timestamp(&comment.edited),
        ])?;
    Ok(())
}

/// Load posts matching `sql`, attaching their comments.
fn query_posts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt
        .query_map(params, PostRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|row| {
            let comments = query_comments(conn, &row.uid)?;
            row.into_post(comments)
        })
        .collect()
}

fn offset(page: u32, limit: u32) -> i64 {
    i64::from(page) * i64::from(limit)
}

/// CRUD operations on blog posts.
#[derive(Clone)]
pub struct PostService {
    db: Database,
}

impl PostService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a post with its comments. An empty id yields `None`.
    pub fn get(&self, post_id: &str) -> Result<Option<Post>> {
        if post_id.is_empty() {
            error!("no post id provided");
            return Ok(None);
        }

        self.db.with_conn(|conn| {
            let row = conn
                .prepare_cached(&format!(
                    "SELECT {} FROM blogposts WHERE uid = ?1",
                    POST_COLUMNS
                ))?
                .query_row([post_id], PostRow::from_row)
                .optional()?;

            match row {
                Some(row) => {
                    let comments = query_comments(conn, post_id)?;
                    Ok(Some(row.into_post(comments)?))
                }
                None => Ok(None),
            }
        })
    }

    /// List posts, newest first.
    pub fn list(&self, page: u32, limit: u32) -> Result<Vec<Post>> {
        self.db.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {} FROM blogposts ORDER BY created DESC LIMIT ?1 OFFSET ?2",
                    POST_COLUMNS
                ),
                params![limit, offset(page, limit)],
            )
        })
    }

    /// Insert a post together with any comments it carries.
    pub fn insert(&self, post: &Post) -> Result<()> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO blogposts VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    post.uid,
                    post.title,
                    post.content,
                    format_timestamp(&post.created),
                    format_timestamp(&post.edited),
                    post.tags.to_bit_string(),
                ],
            )?;
            for comment in &post.comments {
                insert_comment(&tx, &post.uid, comment)?;
            }
            tx.commit()?;
            debug!(uid = %post.uid, comments = post.comments.len(), "inserted post");
            Ok(())
        })
    }

    /// Update title, content, tags, and edit time. Returns whether the post existed.
    pub fn update(&self, post: &Post) -> Result<bool> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE blogposts SET title = ?1, content = ?2, modified = ?3, tags = ?4 WHERE uid = ?5",
                params![
                    post.title,
                    post.content,
                    format_timestamp(&post.edited),
                    post.tags.to_bit_string(),
                    post.uid,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a post and its comments. Returns whether the post existed.
    pub fn delete(&self, post_id: &str) -> Result<bool> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM comments WHERE post_uid = ?1", [post_id])?;
            let changed = tx.execute("DELETE FROM blogposts WHERE uid = ?1", [post_id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    /// Posts created on a calendar day.
    pub fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Post>> {
        let day = date.format("%Y-%m-%d").to_string();
        self.db.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {} FROM blogposts WHERE substr(created, 1, 10) = ?1 ORDER BY created DESC",
                    POST_COLUMNS
                ),
                [day],
            )
        })
    }

    /// Posts created within `[from, to]`, newest first.
    pub fn get_by_daterange(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Post>> {
        if from > to {
            error!(%from, %to, "invalid date range");
            return Ok(Vec::new());
        }
        self.db.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "SELECT {} FROM blogposts WHERE created BETWEEN ?1 AND ?2 \
                     ORDER BY created DESC LIMIT ?3 OFFSET ?4",
                    POST_COLUMNS
                ),
                params![
                    format_timestamp(&from),
                    format_timestamp(&to),
                    limit,
                    offset(page, limit)
                ],
            )
        })
    }
}

/// CRUD operations on comments.
#[derive(Clone)]
pub struct CommentService {
    db: Database,
}

impl CommentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get(&self, comment_id: &str) -> Result<Option<Comment>> {
        if comment_id.is_empty() {
            error!("no comment id provided");
            return Ok(None);
        }

        self.db.with_conn(|conn| {
            conn.prepare_cached(&format!(
                "SELECT {} FROM comments WHERE uid = ?1",
                COMMENT_COLUMNS
            ))?
            .query_row([comment_id], CommentRow::from_row)
            .optional()?
            .map(CommentRow::into_comment)
            .transpose()
        })
    }

    /// Comments on a post, newest first.
    pub fn list(&self, post_id: &str) -> Result<Vec<Comment>> {
        if post_id.is_empty() {
            error!("no post id provided");
            return Ok(Vec::new());
        }
        self.db.with_conn(|conn| query_comments(conn, post_id))
    }

    pub fn insert(&self, post_id: &str, comment: &Comment) -> Result<()> {
        if post_id.is_empty() {
            error!("no post id provided");
            return Ok(());
        }
        self.db.with_conn(|conn| insert_comment(conn, post_id, comment))
    }

    /// Insert several comments on one post atomically.
    pub fn insert_batch(&self, post_id: &str, comments: &[Comment]) -> Result<()> {
        if post_id.is_empty() || comments.is_empty() {
            error!(post_id, count = comments.len(), "nothing to insert");
            return Ok(());
        }
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            for comment in comments {
                insert_comment(&tx, post_id, comment)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Update author, title, content, and edit time. Returns whether the comment existed.
    pub fn update(&self, comment: &Comment) -> Result<bool> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET author = ?1, title = ?2, content = ?3, edited = ?4 WHERE uid = ?5",
                params![
                    comment.author,
                    comment.title,
                    comment.content,
                    format_timestamp(&comment.edited),
                    comment.uid,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete(&self, comment_id: &str) -> Result<bool> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE uid = ?1", [comment_id])?;
            Ok(changed > 0)
        })
    }
}
