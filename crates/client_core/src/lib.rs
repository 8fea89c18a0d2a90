use std::sync::Arc;

pub mod blog;
pub mod config;
pub mod http;
pub mod remote;
pub mod session;
pub mod theme;

pub use blog::{BlogState, BlogStore};
pub use config::{load_settings, load_settings_from, Settings};
pub use http::ServiceClient;
pub use remote::{AuthApi, Query, TableApi};
pub use session::{SessionState, SessionStore};
pub use theme::ThemeConfig;

/// One client handle plus the containers built on it, for a single
/// application context.
pub struct AppContext {
    pub client: Arc<ServiceClient>,
    pub session: SessionStore,
    pub blog: BlogStore,
    pub theme: ThemeConfig,
}

impl AppContext {
    pub fn new(settings: &Settings) -> Self {
        let client = Arc::new(ServiceClient::from_settings(settings));
        Self::with_client(client, &settings.posts_table)
    }

    pub fn with_client(client: Arc<ServiceClient>, posts_table: &str) -> Self {
        let session = SessionStore::new(client.clone());
        let blog = BlogStore::with_table(client.clone(), posts_table);
        Self {
            client,
            session,
            blog,
            theme: ThemeConfig::default(),
        }
    }

    /// Runs each container's mount-time initialisation.
    pub async fn init(&self) {
        tokio::join!(self.session.init(), self.blog.init());
    }
}

#[cfg(test)]
#[path = "tests/fakes.rs"]
pub(crate) mod fakes;
