//! Playlist, transport and volume transitions.
//!
//! None of these return errors: an empty playlist, an unknown track or a
//! failing output only leave a log line behind.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, warn};

use super::state::{PlaybackState, PlayerState, RepeatMode, DEFAULT_VOLUME};
use super::traits::{AudioOutput, LoadId, PlayerEvent};
use super::view::FooterView;
use crate::api::catalog::Track;

pub struct Player {
    output: Box<dyn AudioOutput>,
    state: PlayerState,
    footer: Option<FooterView>,
    /// URL the output holds, once its load was accepted.
    loaded: Option<String>,
    /// Bumped on every load; events tagged with an older id are stale.
    load_id: LoadId,
}

impl Player {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        let mut player = Self {
            output,
            state: PlayerState::default(),
            footer: None,
            loaded: None,
            load_id: 0,
        };
        player.apply_volume();
        player
    }

    /// Attach the footer binding and render it once.
    pub fn with_footer(mut self, footer: FooterView) -> Self {
        self.footer = Some(footer);
        self.refresh();
        self
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn playlist(&self) -> &[Track] {
        &self.state.playlist
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.state.current_track.as_ref()
    }

    pub fn playback(&self) -> PlaybackState {
        self.state.playback()
    }

    /// Id of the most recent load. Output events must carry it to be applied.
    pub fn load_id(&self) -> LoadId {
        self.load_id
    }

    /// Last rendered footer, if a footer is attached.
    pub fn footer_html(&self) -> Option<&str> {
        self.footer.as_ref().map(FooterView::html)
    }

    /// Replace the playlist. Does not start anything. Shuffle is switched
    /// off along with its snapshot, which described the old playlist.
    pub fn set_playlist(&mut self, tracks: Vec<Track>, start_index: usize) {
        debug!(tracks = tracks.len(), start_index, "playlist set");
        self.state.playlist = tracks;
        self.state.original_playlist.clear();
        self.state.shuffle = false;
        self.state.current_index = start_index as isize;
        self.refresh();
    }

    pub fn play_track(&mut self, track: Track) {
        // 1. Refresh the index from the playlist
        if self.state.playlist.is_empty() {
            warn!("no playlist available");
        } else {
            match self.state.index_of(&track.id) {
                Some(i) => self.state.current_index = i as isize,
                None => warn!(track = %track.title, "track not found in playlist"),
            }
        }

        // 2. Load unless it is already the loaded source
        let mut loaded = true;
        match track.playable_url().map(str::to_string) {
            Some(url) if self.loaded.as_deref() == Some(url.as_str()) => {
                if let Err(e) = self.output.seek(0.0) {
                    error!(error = %e, "failed to rewind track");
                }
                self.state.current_time = 0.0;
            }
            Some(url) => {
                self.load_id += 1;
                match self.output.load(&url, self.load_id) {
                    Ok(()) => self.loaded = Some(url),
                    Err(e) => {
                        error!(url = %url, error = %e, "failed to load track");
                        self.loaded = None;
                        loaded = false;
                    }
                }
                self.state.current_time = 0.0;
                self.state.duration = track.duration;
            }
            None => warn!(track = %track.title, "track has no audio url"),
        }

        // 3. Start
        self.state.current_track = Some(track);
        if loaded {
            if let Some(track) = &self.state.current_track {
                info!(track = %track.title, artist = %track.artist_name, "playing");
            }
            self.start();
        } else {
            self.state.is_playing = false;
        }
        self.refresh();
    }

    pub fn play(&mut self) {
        self.start();
        self.refresh();
    }

    pub fn pause(&mut self) {
        if let Err(e) = self.output.pause() {
            error!(error = %e, "failed to pause output");
        }
        self.state.is_playing = false;
        self.refresh();
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn next_track(&mut self) {
        self.step(|i, len| (i + 1).rem_euclid(len));
    }

    pub fn prev_track(&mut self) {
        self.step(|i, len| if i > 0 { i - 1 } else { len - 1 });
    }

    /// Shared by next/prev: repeat-one replays, otherwise move by `advance`.
    fn step(&mut self, advance: impl Fn(isize, isize) -> isize) {
        if self.state.playlist.is_empty() {
            debug!("playlist empty, nothing to skip to");
            return;
        }
        if self.state.repeat_mode == RepeatMode::One {
            self.replay();
            return;
        }

        let len = self.state.playlist.len() as isize;
        let index = advance(self.state.current_index, len);
        self.state.current_index = index;
        if let Some(track) = self.state.playlist.get(index as usize).cloned() {
            self.play_track(track);
        }
    }

    fn replay(&mut self) {
        match self.state.current_track.clone() {
            Some(track) => self.play_track(track),
            None => warn!("nothing to replay"),
        }
    }

    /// Natural end of the current track.
    pub fn handle_track_end(&mut self) {
        if self.state.repeat_mode == RepeatMode::One {
            self.replay();
            return;
        }

        if self.state.repeat_mode == RepeatMode::All || !self.state.is_last() {
            self.next_track();
        } else {
            info!("playlist ended");
            self.state.current_track = None;
            self.state.current_index = -1;
            self.state.is_playing = false;
            self.refresh();
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.toggle_shuffle_with(&mut rand::thread_rng());
    }

    /// Shuffle with a caller-supplied rng, so tests can seed it.
    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.state.shuffle = !self.state.shuffle;

        if self.state.shuffle {
            self.state.original_playlist = self.state.playlist.clone();
            if self.state.playlist.len() > 1 {
                self.state.playlist.shuffle(rng);
            }
            info!("shuffle on");
        } else {
            self.state.playlist = std::mem::take(&mut self.state.original_playlist);
            info!("shuffle off");
        }

        // The old numeric index means nothing after a reorder.
        let index = self
            .state
            .current_track
            .as_ref()
            .and_then(|t| self.state.index_of(&t.id));
        if let Some(i) = index {
            self.state.current_index = i as isize;
        }
        self.refresh();
    }

    pub fn toggle_repeat(&mut self) {
        self.state.repeat_mode = self.state.repeat_mode.cycle();
        info!(mode = self.state.repeat_mode.label(), "repeat mode changed");
        self.refresh();
    }

    /// Clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f64) {
        self.state.volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.apply_volume();
        self.refresh();
    }

    pub fn toggle_mute(&mut self) {
        if self.state.volume > 0.0 {
            self.state.last_volume = self.state.volume;
            self.set_volume(0.0);
        } else {
            let restore = if self.state.last_volume > 0.0 {
                self.state.last_volume
            } else {
                DEFAULT_VOLUME
            };
            self.set_volume(restore);
        }
    }

    /// Jump to `fraction` of the track. Ignored until the duration is known.
    pub fn seek_to(&mut self, fraction: f64) {
        if self.state.duration <= 0.0 {
            debug!("duration unknown, seek ignored");
            return;
        }
        let position = self.state.duration * fraction.clamp(0.0, 1.0);
        if let Err(e) = self.output.seek(position) {
            error!(error = %e, "seek failed");
            return;
        }
        self.state.current_time = position;
        self.refresh();
    }

    /// Apply something the output reported. Events from a load that has
    /// since been replaced are dropped; returns whether the event was applied.
    pub fn handle_event(&mut self, event: PlayerEvent) -> bool {
        if event.load() != self.load_id {
            debug!(event = ?event, current = self.load_id, "stale output event dropped");
            return false;
        }

        match event {
            PlayerEvent::MetadataLoaded { duration, .. } => {
                self.state.duration = duration;
                self.refresh();
            }
            PlayerEvent::TimeUpdate { time, .. } => {
                self.state.current_time = time;
                self.refresh();
            }
            PlayerEvent::Ended { .. } => {
                self.state.is_playing = false;
                self.handle_track_end();
            }
            PlayerEvent::LoadFailed { reason, .. } => {
                error!(reason = %reason, "output could not load track");
                // Forget the source so playing the track again re-fetches it.
                self.loaded = None;
                self.state.is_playing = false;
                self.refresh();
            }
        }
        true
    }

    fn start(&mut self) {
        if let Err(e) = self.output.play() {
            error!(error = %e, "failed to start output");
        }
        self.state.is_playing = true;
    }

    fn apply_volume(&mut self) {
        if let Err(e) = self.output.set_volume(self.state.volume) {
            error!(error = %e, "failed to set volume");
        }
    }

    fn refresh(&mut self) {
        if let Some(footer) = self.footer.as_mut() {
            footer.render(&self.state);
        }
    }
}
