//! Minimal HTML template engine used for every catalog view and the
//! now-playing footer.
//!
//! Templates know three directives: `{{path.to.value}}`, `{{helper arg...}}`
//! and `{{#each key}}...{{/each}}`. Rendering never fails: unknown templates
//! render as an empty string and unresolved placeholders stay in the output
//! verbatim.

pub mod context;
pub mod helpers;
pub mod parse;
pub mod render;
pub mod source;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub use helpers::{format_duration, format_number_user};
pub use parse::Node;
pub use source::{FsTemplateSource, HttpTemplateSource, TemplateSource};

pub const ALL_ALBUMS: &str = "all-albums";
pub const POPULAR_ALBUM: &str = "popular-album";
pub const NEW_RELEASES: &str = "new-releases";
pub const ALBUM_DETAIL: &str = "album-detail";
pub const FOOTER: &str = "footer";

/// Every view template and the file it is loaded from, in load order.
pub const TEMPLATE_FILES: [(&str, &str); 5] = [
    (ALL_ALBUMS, "content-all-albums.html"),
    (POPULAR_ALBUM, "content-popular-album.html"),
    (NEW_RELEASES, "content-new-releases.html"),
    (ALBUM_DETAIL, "content-album-detail.html"),
    (FOOTER, "footer.html"),
];

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` is not loaded")]
    NotLoaded(String),
    #[error("templates were not ready within {0:?}")]
    Timeout(Duration),
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch template {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("template {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// A parsed template. Immutable once built.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let nodes = parse::parse(&source);
        Self { source, nodes }
    }

    pub fn render(&self, context: &Value) -> String {
        render::render_nodes(&self.nodes, context)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Named templates plus a one-shot "loading finished" signal.
///
/// Loading happens once in the background; any number of renderers can wait
/// on [`TemplateRegistry::wait_for`] instead of polling.
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, Arc<Template>>>,
    ready: watch::Sender<bool>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            templates: RwLock::new(HashMap::new()),
            ready,
        }
    }

    /// Registry with the given templates already loaded and marked ready.
    pub fn with_templates<'a>(templates: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let registry = Self::new();
        for (name, source) in templates {
            registry.insert(name, source);
        }
        registry.mark_ready();
        registry
    }

    pub fn insert(&self, name: &str, source: &str) {
        self.write()
            .insert(name.to_string(), Arc::new(Template::parse(source)));
    }

    /// Load every known template in order. Failures are logged and skipped;
    /// readiness is signalled once all attempts finished.
    pub async fn load_all<S: TemplateSource>(&self, source: &S) -> usize {
        let mut loaded = 0;
        for (name, file) in TEMPLATE_FILES {
            match source.fetch(file).await {
                Ok(text) => {
                    self.insert(name, &text);
                    debug!(template = name, file, bytes = text.len(), "template loaded");
                    loaded += 1;
                }
                Err(e) => error!(template = name, error = %e, "failed to load template"),
            }
        }
        info!(loaded, total = TEMPLATE_FILES.len(), "template loading finished");
        self.mark_ready();
        loaded
    }

    /// Load in a background task.
    pub fn spawn_load<S>(self: &Arc<Self>, source: S) -> tokio::task::JoinHandle<usize>
    where
        S: TemplateSource + 'static,
    {
        let registry = Arc::clone(self);
        tokio::spawn(async move { registry.load_all(&source).await })
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn loaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.read().get(name).cloned()
    }

    /// Resolve once every name is available. If loading finishes without one
    /// of them, fails with `NotLoaded`; `timeout` bounds the wait.
    pub async fn wait_for(&self, names: &[&str], timeout: Duration) -> Result<(), TemplateError> {
        if names.iter().all(|name| self.is_loaded(name)) {
            return Ok(());
        }

        let mut rx = self.ready.subscribe();
        if tokio::time::timeout(timeout, rx.wait_for(|ready| *ready))
            .await
            .is_err()
        {
            return Err(TemplateError::Timeout(timeout));
        }

        match names.iter().find(|name| !self.is_loaded(name)) {
            Some(missing) => Err(TemplateError::NotLoaded(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Render `name` against `context`. Unknown templates render as `""`.
    pub fn render(&self, name: &str, context: &Value) -> String {
        match self.get(name) {
            Some(template) => template.render(context),
            None => {
                error!(template = name, "template not found");
                String::new()
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Template>>> {
        self.templates.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Template>>> {
        self.templates.write().unwrap_or_else(|e| e.into_inner())
    }
}
