//! Collection container for blog posts, kept newest-first.

use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{BlogPost, NewBlogPost, PostId},
    error::RemoteError,
};
use tokio::sync::watch;
use tracing::{error, info};

use crate::remote::{error_text, Query, RemoteResult, TableApi};

pub const DEFAULT_POSTS_TABLE: &str = "blogs";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogState {
    pub posts: Vec<BlogPost>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct BlogStore {
    tables: Arc<dyn TableApi>,
    table: String,
    state: watch::Sender<BlogState>,
}

impl BlogStore {
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self::with_table(tables, DEFAULT_POSTS_TABLE)
    }

    pub fn with_table(tables: Arc<dyn TableApi>, table: impl Into<String>) -> Self {
        let (state, _) = watch::channel(BlogState::default());
        Self {
            tables,
            table: table.into(),
            state,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn subscribe(&self) -> watch::Receiver<BlogState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> BlogState {
        self.state.borrow().clone()
    }

    pub fn posts(&self) -> Vec<BlogPost> {
        self.state.borrow().posts.clone()
    }

    pub async fn init(&self) {
        self.fetch_posts().await;
    }

    /// Replaces the local list with every post, newest first. On failure the
    /// previous list stays visible.
    pub async fn fetch_posts(&self) -> bool {
        self.begin();
        let query = Query::new().order("date", false);
        let result = self
            .tables
            .select(&self.table, &query)
            .await
            .and_then(decode_rows);

        self.finish("fetching posts", result, |posts, fetched| {
            *posts = fetched;
        })
    }

    pub async fn add_post(&self, post: NewBlogPost) -> bool {
        self.begin();
        let result = match encode(&post) {
            Ok(row) => self
                .tables
                .insert_single(&self.table, row)
                .await
                .and_then(decode_row),
            Err(err) => Err(err),
        };

        self.finish("adding post", result, |posts, stored| {
            info!(post_id = %stored.id, "post added");
            posts.insert(0, stored);
        })
    }

    /// Replaces the matching local entry after the remote update succeeds.
    /// An id with no local entry is not an error.
    pub async fn update_post(&self, post: BlogPost) -> bool {
        self.begin();
        let query = Query::new().eq("id", post.id.as_str());
        let result = match encode(&post) {
            Ok(patch) => self.tables.update(&self.table, patch, &query).await,
            Err(err) => Err(err),
        };

        self.finish("updating post", result, |posts, ()| {
            if let Some(existing) = posts.iter_mut().find(|existing| existing.id == post.id) {
                *existing = post;
            }
        })
    }

    pub async fn delete_post(&self, id: &PostId) -> bool {
        self.begin();
        let query = Query::new().eq("id", id.as_str());
        let result = self.tables.delete(&self.table, &query).await;

        self.finish("deleting post", result, |posts, ()| {
            posts.retain(|post| &post.id != id);
        })
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn finish<T>(
        &self,
        action: &'static str,
        result: RemoteResult<T>,
        apply: impl FnOnce(&mut Vec<BlogPost>, T),
    ) -> bool {
        match result {
            Ok(value) => {
                self.state.send_modify(|s| {
                    apply(&mut s.posts, value);
                    s.is_loading = false;
                });
                true
            }
            Err(err) => {
                error!(action, code = ?err.code, error = %err, "post operation failed");
                self.state.send_modify(|s| {
                    s.error = Some(error_text(&err));
                    s.is_loading = false;
                });
                false
            }
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> RemoteResult<Value> {
    serde_json::to_value(value).map_err(|err| RemoteError::decode(err.to_string()))
}

fn decode_row(row: Value) -> RemoteResult<BlogPost> {
    serde_json::from_value(row).map_err(|err| RemoteError::decode(format!("malformed post: {err}")))
}

fn decode_rows(rows: Vec<Value>) -> RemoteResult<Vec<BlogPost>> {
    rows.into_iter().map(decode_row).collect()
}

#[cfg(test)]
#[path = "tests/blog_tests.rs"]
mod tests;
