use anyhow::Result;

/// Tag handed to [`AudioOutput::load`] and echoed back in every event the
/// output sends for that load.
pub type LoadId = u64;

/// The one handle that actually makes sound 🔊
///
/// Owned exclusively by the `Player`; nothing else starts, stops or seeks it.
/// Loading may finish (or fail) after `load` returns; the outcome arrives as
/// a [`PlayerEvent`] carrying the same [`LoadId`].
pub trait AudioOutput: Send {
    fn load(&mut self, url: &str, load: LoadId) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    /// `volume` in `[0, 1]`.
    fn set_volume(&mut self, volume: f64) -> Result<()>;
    fn seek(&mut self, position_secs: f64) -> Result<()>;
}

/// What an output reports back while playing.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Duration in seconds, once known.
    MetadataLoaded { load: LoadId, duration: f64 },
    /// Current position in seconds.
    TimeUpdate { load: LoadId, time: f64 },
    /// Natural end of the track.
    Ended { load: LoadId },
    /// The source could not be fetched or decoded.
    LoadFailed { load: LoadId, reason: String },
}

impl PlayerEvent {
    pub fn load(&self) -> LoadId {
        match self {
            Self::MetadataLoaded { load, .. }
            | Self::TimeUpdate { load, .. }
            | Self::Ended { load }
            | Self::LoadFailed { load, .. } => *load,
        }
    }
}
