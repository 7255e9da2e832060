//! The application shell: one owner for the session, browser, player and
//! toasts, driven by a single event loop.

pub mod cli;
pub mod config;
pub mod events;
pub mod logging;
pub mod shell;
pub mod toast;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::api::auth::{AuthFailure, AuthOutcome, AuthService, Credentials, FormField};
use crate::api::catalog::{ArtistList, Catalog, CatalogSource};
use crate::api::ApiClient;
use crate::browser::{BrowseError, Browser, Navigation, CONTENT_LOADING_HTML};
use crate::player::{self, FooterView, Player, PlayerEvent};
use crate::session::{FileSessionStore, Session};
use crate::template::{FsTemplateSource, HttpTemplateSource, TemplateRegistry};

pub use config::{AppConfig, UserConfig};
pub use events::AppEvent;
pub use shell::{ShellCommand, HELP};
pub use toast::{Toast, ToastKind, Toasts};

pub struct App<C = Catalog> {
    pub config: UserConfig,
    pub session: Session,
    pub auth: AuthService,
    pub browser: Browser<C>,
    pub player: Player,
    pub toasts: Toasts,
    pub running: bool,
    /// Print toasts to stderr as they appear.
    pub echo_toasts: bool,
}

impl App<Catalog> {
    /// Wire everything from the config: HTTP client, template loading, the
    /// stored session and an audio output. `templates_dir` may also be an
    /// http(s) base URL.
    pub fn from_config(
        config: UserConfig,
        audio: bool,
    ) -> Result<(Self, UnboundedReceiver<PlayerEvent>)> {
        // Global HTTP Client (Reused)
        let client = reqwest::Client::builder()
            .user_agent(concat!("swara/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api = ApiClient::new(client.clone(), &config.api_base_url);

        // Templates load in the background; views wait on readiness.
        let templates = Arc::new(TemplateRegistry::new());
        let dir = config.templates_dir.as_str();
        if dir.starts_with("http://") || dir.starts_with("https://") {
            templates.spawn_load(HttpTemplateSource::new(client, dir));
        } else {
            templates.spawn_load(FsTemplateSource::new(dir));
        }

        let session = Session::restored(Box::new(FileSessionStore::open(
            AppConfig::get_session_path(),
        )));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let output = player::get_output(audio, events_tx, config.default_volume);

        let browser = Browser::new(
            Catalog::new(api.clone()),
            Arc::clone(&templates),
            Duration::from_millis(config.template_timeout_ms),
        );
        let app = App::new(config, session, AuthService::new(api), browser, output);
        Ok((app, events_rx))
    }
}

impl<C: CatalogSource> App<C> {
    pub fn new(
        config: UserConfig,
        session: Session,
        auth: AuthService,
        browser: Browser<C>,
        output: Box<dyn player::AudioOutput>,
    ) -> Self {
        let mut player =
            Player::new(output).with_footer(FooterView::new(Arc::clone(browser.templates())));
        player.set_volume(config.default_volume);
        let toasts = Toasts::new(Duration::from_millis(config.toast_duration_ms));

        Self {
            config,
            session,
            auth,
            browser,
            player,
            toasts,
            running: true,
            echo_toasts: false,
        }
    }

    pub fn notify(&mut self, kind: ToastKind, message: &str) {
        let echo = self.echo_toasts;
        let toast = self.toasts.show(kind, message);
        if echo {
            eprintln!("{toast}");
        }
    }

    /// Render the home page. `None` when nothing new went on screen.
    pub async fn show_home(&mut self) -> Option<String> {
        match self.browser.home().await {
            Ok(Navigation::Rendered) => Some(self.browser.content()),
            Ok(Navigation::Incomplete) => {
                self.notify(ToastKind::Warning, "Some sections could not be loaded");
                None
            }
            Ok(Navigation::Superseded) => None,
            Err(e) => {
                warn!(error = %e, "home page failed");
                self.notify(ToastKind::Error, "Could not load content");
                Some(CONTENT_LOADING_HTML.to_string())
            }
        }
    }

    /// Open an album and hand its tracks to the player as the playlist.
    pub async fn open_album(&mut self, id: &str) -> bool {
        let result = self.browser.album(id).await;
        match result {
            Ok(Navigation::Superseded) => false,
            Ok(navigation) => {
                if let Some(album) = self.browser.current_album() {
                    debug!(album = id, tracks = album.tracks.len(), "playlist from album");
                    self.player.set_playlist(album.tracks, 0);
                }
                if navigation == Navigation::Incomplete {
                    self.notify(ToastKind::Warning, "Album view could not be rendered");
                }
                true
            }
            Err(BrowseError::Api(e)) => {
                warn!(album = id, error = %e, "album fetch failed");
                self.notify(ToastKind::Error, &format!("Could not load album: {}", e));
                false
            }
            Err(e) => {
                warn!(album = id, error = %e, "album render failed");
                self.notify(ToastKind::Error, "Album page is not available");
                false
            }
        }
    }

    pub fn play_first_track(&mut self) {
        let first = self
            .browser
            .current_album()
            .and_then(|album| album.tracks.into_iter().next());
        match first {
            Some(track) => self.player.play_track(track),
            None => {
                warn!("no tracks available to play");
                self.notify(ToastKind::Warning, "No tracks available to play");
            }
        }
        self.sync_highlight();
    }

    pub fn play_track_by_id(&mut self, id: &str) {
        let Some(album) = self.browser.current_album() else {
            self.notify(ToastKind::Error, "No album open");
            return;
        };
        match album.track(id) {
            Some(track) => self.player.play_track(track.clone()),
            None => {
                warn!(track = id, "track not found in album");
                self.notify(ToastKind::Error, &format!("Track not found: {id}"));
            }
        }
        self.sync_highlight();
    }

    /// Keep the album page's playing mark on the player's current track.
    fn sync_highlight(&mut self) {
        let id = self.player.current_track().map(|t| t.id.clone());
        self.browser.highlight(id.as_deref());
    }

    pub async fn artists(&mut self) -> Option<ArtistList> {
        match self.browser.artists().await {
            Ok(list) => Some(list),
            Err(e) => {
                warn!(error = %e, "artists failed");
                self.notify(ToastKind::Error, "Could not load artists");
                None
            }
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> AuthOutcome {
        let credentials = Credentials::new(email, password);
        let outcome = self.auth.login(&mut self.session, &credentials).await;
        self.report(&outcome);
        outcome
    }

    pub async fn signup(&mut self, email: &str, password: &str) -> AuthOutcome {
        let credentials = Credentials::new(email, password);
        let outcome = self.auth.signup(&mut self.session, &credentials).await;
        self.report(&outcome);
        outcome
    }

    pub async fn logout(&mut self) -> AuthOutcome {
        let outcome = self.auth.logout(&mut self.session).await;
        self.report(&outcome);
        outcome
    }

    fn report(&mut self, outcome: &AuthOutcome) {
        match outcome {
            Ok(success) => self.notify(ToastKind::Success, &success.message),
            Err(AuthFailure { field, message }) => {
                let text = match field {
                    Some(FormField::Email) => format!("email: {message}"),
                    Some(FormField::Password) => format!("password: {message}"),
                    _ => message.clone(),
                };
                self.notify(ToastKind::Error, &text);
            }
        }
    }

    pub fn whoami(&mut self) -> Option<String> {
        self.session.current_user().map(|u| u.email.clone())
    }

    /// Apply one event. Returns text for the user, if any.
    pub fn handle_event(&mut self, event: AppEvent) -> Option<String> {
        let reply = match event {
            AppEvent::Input(command) => self.apply_command(command),
            AppEvent::Player(event) => self.apply_player_event(event),
            AppEvent::Tick => {
                self.toasts.on_tick();
                return None;
            }
        };
        self.sync_highlight();
        reply
    }

    fn apply_player_event(&mut self, event: PlayerEvent) -> Option<String> {
        let seen = event.clone();
        if !self.player.handle_event(event) {
            return None;
        }
        match seen {
            PlayerEvent::Ended { .. } => match self.player.current_track() {
                Some(t) => Some(format!("▶ {} - {}", t.title, t.artist_name)),
                None => {
                    self.notify(ToastKind::Info, "Playlist finished");
                    None
                }
            },
            PlayerEvent::LoadFailed { reason, .. } => {
                warn!(reason = %reason, "playback failed");
                self.notify(ToastKind::Error, &format!("Could not play track: {reason}"));
                None
            }
            _ => None,
        }
    }

    pub fn apply_command(&mut self, command: ShellCommand) -> Option<String> {
        match command {
            ShellCommand::Play => {
                if self.player.current_track().is_none() {
                    self.play_first_track();
                } else {
                    self.player.play();
                }
            }
            ShellCommand::Pause => self.player.pause(),
            ShellCommand::Toggle => self.player.toggle_play(),
            ShellCommand::Next => self.player.next_track(),
            ShellCommand::Prev => self.player.prev_track(),
            ShellCommand::Shuffle => self.player.toggle_shuffle(),
            ShellCommand::Repeat => self.player.toggle_repeat(),
            ShellCommand::Volume(v) => self.player.set_volume(v),
            ShellCommand::Mute => self.player.toggle_mute(),
            ShellCommand::Seek(f) => self.player.seek_to(f),
            ShellCommand::Track(id) => self.play_track_by_id(&id),
            ShellCommand::Footer => return self.player.footer_html().map(str::to_string),
            ShellCommand::Help => return Some(HELP.to_string()),
            ShellCommand::Status => {}
            ShellCommand::Quit => {
                self.running = false;
                return None;
            }
        }
        Some(self.status_line())
    }

    pub fn status_line(&self) -> String {
        let state = self.player.state();
        let track = state
            .current_track
            .as_ref()
            .map(|t| format!("{} - {}", t.title, t.artist_name))
            .unwrap_or_else(|| "nothing playing".to_string());
        format!(
            "{:?} | {} | {}/{} | vol {:.0}% | repeat {} | shuffle {}",
            self.player.playback(),
            track,
            crate::template::format_duration(state.current_time),
            crate::template::format_duration(state.duration),
            state.volume * 100.0,
            state.repeat_mode.label(),
            if state.shuffle { "on" } else { "off" },
        )
    }

    /// Interactive loop over stdin lines and output events until `quit` or
    /// end of input.
    pub async fn run(&mut self, mut player_events: UnboundedReceiver<PlayerEvent>) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppEvent>(100);

        // 1. Input Event Task
        let tx_input = tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ShellCommand>() {
                    Ok(command) => {
                        if tx_input.send(AppEvent::Input(command)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            let _ = tx_input.send(AppEvent::Input(ShellCommand::Quit)).await;
        });

        // 2. Tick Task
        let tx_tick = tx;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx_tick.send(AppEvent::Tick).await.is_err() {
                    break;
                }
            }
        });

        info!("interactive session started");
        println!("{HELP}");
        while self.running {
            let event = tokio::select! {
                Some(event) = rx.recv() => event,
                Some(event) = player_events.recv() => AppEvent::Player(event),
                else => break,
            };
            if let Some(text) = self.handle_event(event) {
                println!("{text}");
            }
        }
        info!("interactive session finished");
        Ok(())
    }
}
