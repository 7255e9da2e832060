//! Maps player state onto the `footer` template.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use super::state::{PlayerState, RepeatMode};
use crate::template::{format_duration, TemplateRegistry, FOOTER};

pub const PLACEHOLDER_IMAGE: &str = "placeholder.svg?height=56&width=56";

/// Footer shown when nothing is selected.
pub fn default_track() -> Value {
    json!({
        "image_url": PLACEHOLDER_IMAGE,
        "title": "No song selected",
        "artist_name": "Pick a song to play",
        "duration": 0,
    })
}

/// Control bindings derived from the state. These are what the template uses
/// for the play button, volume bar, progress bar and the two mode buttons.
pub fn controls(state: &PlayerState) -> Value {
    let repeat_icon = match state.repeat_mode {
        RepeatMode::One => "fas fa-redo-alt",
        _ => "fas fa-redo",
    };
    json!({
        "playIcon": if state.is_playing { "fas fa-pause" } else { "fas fa-play" },
        "volumeIcon": state.volume_icon().class(),
        "volumePercent": round(state.volume * 100.0),
        "progressPercent": round(state.progress_percent()),
        "currentTime": format_duration(state.current_time),
        "repeatClass": if state.repeat_mode == RepeatMode::None { "" } else { "active" },
        "repeatBadge": state.repeat_mode.badge(),
        "repeatIcon": repeat_icon,
        "shuffleClass": if state.shuffle { "active" } else { "" },
    })
}

/// Render context for the footer.
pub fn footer_context(state: &PlayerState) -> Value {
    let track = state
        .current_track
        .as_ref()
        .map(|t| t.to_value())
        .unwrap_or_else(default_track);
    json!({ "currentTrack": track, "controls": controls(state) })
}

fn round(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The "now playing" footer. Rebuilt in full on every state change 🎛️
pub struct FooterView {
    templates: Arc<TemplateRegistry>,
    html: String,
}

impl FooterView {
    pub fn new(templates: Arc<TemplateRegistry>) -> Self {
        Self {
            templates,
            html: String::new(),
        }
    }

    pub fn render(&mut self, state: &PlayerState) -> &str {
        if !self.templates.is_loaded(FOOTER) {
            warn!("footer template not loaded yet");
        }
        self.html = self.templates.render(FOOTER, &footer_context(state));
        &self.html
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}
