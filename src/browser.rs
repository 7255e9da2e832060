//! Catalog views: the home page (all albums, popular, new releases) and the
//! album detail page, rendered through the template registry into one
//! "current content" slot.
//!
//! Every navigation takes a new generation number. A navigation that finds a
//! newer generation after one of its awaits gives up quietly, so a slow
//! response can never overwrite what a later click already put on screen.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::catalog::{AlbumDetail, AlbumList, ArtistList, CatalogSource};
use crate::api::ApiError;
use crate::template::{
    TemplateError, TemplateRegistry, ALBUM_DETAIL, ALL_ALBUMS, NEW_RELEASES, POPULAR_ALBUM,
};

pub const ALBUM_LOADING_HTML: &str = r#"<div class="loading-container"><div class="loading-spinner"></div><p>Loading album...</p></div>"#;
pub const CONTENT_LOADING_HTML: &str = r#"<div class="content__loading"><div class="loading-spinner"></div><p>Loading content...</p></div>"#;

const HOME_TEMPLATES: [&str; 3] = [ALL_ALBUMS, POPULAR_ALBUM, NEW_RELEASES];

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("templates not ready: {0}")]
    NotReady(#[from] TemplateError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// How a navigation ended, when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Content replaced.
    Rendered,
    /// Finished but something came back empty; content left as it was.
    Incomplete,
    /// A newer navigation started meanwhile; nothing was touched.
    Superseded,
}

pub struct Browser<C> {
    catalog: C,
    templates: Arc<TemplateRegistry>,
    timeout: Duration,
    generation: AtomicU64,
    content: Mutex<String>,
    album: Mutex<Option<AlbumDetail>>,
    // Whether `content` is the rendered `album`.
    showing_album: AtomicBool,
    playing: Mutex<Option<String>>,
}

impl<C: CatalogSource> Browser<C> {
    pub fn new(catalog: C, templates: Arc<TemplateRegistry>, timeout: Duration) -> Self {
        Self {
            catalog,
            templates,
            timeout,
            generation: AtomicU64::new(0),
            content: Mutex::new(String::new()),
            album: Mutex::new(None),
            showing_album: AtomicBool::new(false),
            playing: Mutex::new(None),
        }
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Whatever is currently on screen.
    pub fn content(&self) -> String {
        lock(&self.content).clone()
    }

    /// The album last opened with [`Browser::album`].
    pub fn current_album(&self) -> Option<AlbumDetail> {
        lock(&self.album).clone()
    }

    /// Home page: all three sections, in order, or nothing at all.
    pub async fn home(&self) -> Result<Navigation, BrowseError> {
        let generation = self.begin();

        self.templates.wait_for(&HOME_TEMPLATES, self.timeout).await?;
        if !self.is_current(generation) {
            return Ok(Navigation::Superseded);
        }

        let mut sections = Vec::with_capacity(HOME_TEMPLATES.len());
        for name in HOME_TEMPLATES {
            let fetched = match name {
                ALL_ALBUMS => self.catalog.albums().await,
                POPULAR_ALBUM => self.catalog.popular_albums().await,
                _ => self.catalog.new_releases().await,
            };
            if !self.is_current(generation) {
                debug!(generation, "home navigation superseded");
                return Ok(Navigation::Superseded);
            }
            sections.push(self.section(name, fetched));
        }

        if sections.iter().any(String::is_empty) {
            warn!("home page incomplete, keeping current content");
            return Ok(Navigation::Incomplete);
        }

        self.set_content(sections.concat());
        info!("home page rendered");
        Ok(Navigation::Rendered)
    }

    fn section(&self, name: &str, fetched: Result<AlbumList, ApiError>) -> String {
        match fetched {
            Ok(list) => self
                .templates
                .render(name, &json!({ "albums": list.albums })),
            Err(e) => {
                error!(section = name, error = %e, "failed to fetch albums");
                String::new()
            }
        }
    }

    /// Album detail. Shows the loading placeholder right away.
    pub async fn album(&self, id: &str) -> Result<Navigation, BrowseError> {
        let generation = self.begin();
        self.set_content(ALBUM_LOADING_HTML.to_string());

        let detail = self.catalog.album_detail(id).await;
        if !self.is_current(generation) {
            debug!(album = id, generation, "album navigation superseded");
            return Ok(Navigation::Superseded);
        }
        let detail = detail.inspect_err(|e| error!(album = id, error = %e, "failed to fetch album"))?;

        self.templates.wait_for(&[ALBUM_DETAIL], self.timeout).await?;
        if !self.is_current(generation) {
            return Ok(Navigation::Superseded);
        }

        let playing = lock(&self.playing).clone();
        let html = self
            .templates
            .render(ALBUM_DETAIL, &detail_context(&detail, playing.as_deref()));
        *lock(&self.album) = Some(detail);
        if html.is_empty() {
            return Ok(Navigation::Incomplete);
        }

        self.show_album(html);
        info!(album = id, "album rendered");
        Ok(Navigation::Rendered)
    }

    /// Mark `track_id` as the playing track. The album page is re-rendered
    /// when it is on screen; returns whether it was.
    pub fn highlight(&self, track_id: Option<&str>) -> bool {
        {
            let mut playing = lock(&self.playing);
            if playing.as_deref() == track_id {
                return false;
            }
            *playing = track_id.map(str::to_string);
        }
        if !self.showing_album.load(Ordering::SeqCst) {
            return false;
        }
        let Some(detail) = self.current_album() else {
            return false;
        };

        let html = self
            .templates
            .render(ALBUM_DETAIL, &detail_context(&detail, track_id));
        if html.is_empty() {
            return false;
        }
        debug!(track = ?track_id, "album highlight updated");
        self.show_album(html);
        true
    }

    /// Artists are listed, not templated.
    pub async fn artists(&self) -> Result<ArtistList, BrowseError> {
        Ok(self.catalog.artists().await?)
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_content(&self, html: String) {
        self.showing_album.store(false, Ordering::SeqCst);
        *lock(&self.content) = html;
    }

    fn show_album(&self, html: String) {
        *lock(&self.content) = html;
        self.showing_album.store(true, Ordering::SeqCst);
    }
}

/// Each track gets `playingClass`: `"playing"` for the track the player is
/// on, `""` otherwise.
fn detail_context(detail: &AlbumDetail, playing: Option<&str>) -> Value {
    let tracks: Vec<Value> = detail
        .tracks
        .iter()
        .map(|t| {
            let mut value = t.to_value();
            if let Value::Object(fields) = &mut value {
                let class = if playing == Some(t.id.as_str()) { "playing" } else { "" };
                fields.insert("playingClass".into(), class.into());
            }
            value
        })
        .collect();
    json!({
        "album": detail.album,
        "tracks": tracks,
        "total": detail.total.unwrap_or(detail.tracks.len() as u64),
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::catalog::Track;
    use std::future::Future;

    /// In-memory catalog. `fail_popular` makes the popular section error;
    /// album detail for id `slow` answers later than any other id.
    #[derive(Default)]
    struct FakeCatalog {
        fail_popular: bool,
    }

    fn albums(titles: &[&str]) -> AlbumList {
        AlbumList {
            albums: titles.iter().map(|t| json!({ "title": t })).collect(),
        }
    }

    impl CatalogSource for FakeCatalog {
        fn albums(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send {
            async { Ok(albums(&["A", "B"])) }
        }

        fn popular_albums(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send {
            let fail = self.fail_popular;
            async move {
                if fail {
                    Err(ApiError::Status {
                        status: 500,
                        status_text: "Internal Server Error".into(),
                        message: "boom".into(),
                        data: Value::Null,
                    })
                } else {
                    Ok(albums(&["P"]))
                }
            }
        }

        fn new_releases(&self) -> impl Future<Output = Result<AlbumList, ApiError>> + Send {
            async { Ok(albums(&["N"])) }
        }

        fn album_detail(&self, id: &str) -> impl Future<Output = Result<AlbumDetail, ApiError>> + Send {
            let id = id.to_string();
            async move {
                let delay = if id == "slow" { 60 } else { 5 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(AlbumDetail {
                    album: json!({ "id": id, "title": format!("Album {id}") }),
                    tracks: vec![Track::new(&format!("{id}-1"), "First", "Someone", 61.0)],
                    total: None,
                })
            }
        }

        fn artists(&self) -> impl Future<Output = Result<ArtistList, ApiError>> + Send {
            async { Ok(ArtistList { artists: vec![json!({ "name": "Someone" })] }) }
        }
    }

    fn registry() -> Arc<TemplateRegistry> {
        Arc::new(TemplateRegistry::with_templates([
            (ALL_ALBUMS, "[all:{{#each albums}}{{title}}{{/each}}]"),
            (POPULAR_ALBUM, "[pop:{{#each albums}}{{title}}{{/each}}]"),
            (NEW_RELEASES, "[new:{{#each albums}}{{title}}{{/each}}]"),
            (
                ALBUM_DETAIL,
                "<h1>{{album.title}}</h1>{{total}}{{#each tracks}}<li>{{title}} {{formatDuration duration}}</li>{{/each}}",
            ),
        ]))
    }

    fn browser(catalog: FakeCatalog) -> Browser<FakeCatalog> {
        Browser::new(catalog, registry(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_home_renders_sections_in_order() {
        let browser = browser(FakeCatalog::default());
        assert_eq!(browser.home().await.unwrap(), Navigation::Rendered);
        assert_eq!(browser.content(), "[all:AB][pop:P][new:N]");
    }

    #[tokio::test]
    async fn test_home_with_failed_section_keeps_content() {
        let browser = browser(FakeCatalog { fail_popular: true });
        browser.set_content("before".into());
        assert_eq!(browser.home().await.unwrap(), Navigation::Incomplete);
        assert_eq!(browser.content(), "before");
    }

    #[tokio::test]
    async fn test_home_without_templates_times_out() {
        let browser = Browser::new(
            FakeCatalog::default(),
            Arc::new(TemplateRegistry::new()),
            Duration::from_millis(20),
        );
        let err = browser.home().await.unwrap_err();
        assert!(matches!(err, BrowseError::NotReady(TemplateError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_album_detail_renders_tracks() {
        let browser = browser(FakeCatalog::default());
        assert_eq!(browser.album("a1").await.unwrap(), Navigation::Rendered);
        assert_eq!(browser.content(), "<h1>Album a1</h1>1<li>First 1:01</li>");
        let album = browser.current_album().unwrap();
        assert_eq!(album.tracks[0].id, "a1-1");
    }

    #[tokio::test]
    async fn test_stale_album_does_not_overwrite_newer() {
        let browser = browser(FakeCatalog::default());
        let (slow, fast) = tokio::join!(browser.album("slow"), browser.album("fast"));
        assert_eq!(slow.unwrap(), Navigation::Superseded);
        assert_eq!(fast.unwrap(), Navigation::Rendered);
        assert_eq!(browser.content(), "<h1>Album fast</h1>1<li>First 1:01</li>");
        assert_eq!(browser.current_album().unwrap().tracks[0].id, "fast-1");
    }

    #[tokio::test]
    async fn test_playing_track_is_highlighted() {
        let templates = registry();
        templates.insert(
            ALBUM_DETAIL,
            "{{#each tracks}}<li class=\"{{playingClass}}\">{{id}}</li>{{/each}}",
        );
        let browser = Browser::new(FakeCatalog::default(), templates, Duration::from_secs(1));
        browser.album("a1").await.unwrap();
        assert_eq!(browser.content(), "<li class=\"\">a1-1</li>");

        assert!(browser.highlight(Some("a1-1")));
        assert_eq!(browser.content(), "<li class=\"playing\">a1-1</li>");
        // Unchanged id does nothing.
        assert!(!browser.highlight(Some("a1-1")));

        // Off the album page the content is left alone, but the mark is kept
        // for the next album render.
        browser.home().await.unwrap();
        assert!(!browser.highlight(None));
        browser.highlight(Some("b-1"));
        assert_eq!(browser.content(), "[all:AB][pop:P][new:N]");
        browser.album("b").await.unwrap();
        assert_eq!(browser.content(), "<li class=\"playing\">b-1</li>");
    }

    #[tokio::test]
    async fn test_artists_passthrough() {
        let browser = browser(FakeCatalog::default());
        let list = browser.artists().await.unwrap();
        assert_eq!(list.artists[0]["name"], "Someone");
    }
}
