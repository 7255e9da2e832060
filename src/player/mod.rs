pub mod machine;
pub mod output;
pub mod state;
pub mod traits;
pub mod view;

pub use machine::Player;
#[cfg(feature = "playback")]
pub use output::RodioOutput;
pub use output::{NullOutput, RecordingOutput};
pub use state::{PlaybackState, PlayerState, RepeatMode, VolumeIcon};
pub use traits::{AudioOutput, LoadId, PlayerEvent};
pub use view::FooterView;

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Factory for the best available output 🔊
///
/// Falls back to a silent output when sound is disabled or no device opens.
pub fn get_output(
    enabled: bool,
    events: UnboundedSender<PlayerEvent>,
    volume: f64,
) -> Box<dyn AudioOutput> {
    if !enabled {
        return Box::new(NullOutput::new());
    }

    #[cfg(feature = "playback")]
    {
        match RodioOutput::spawn(events, volume) {
            Ok(output) => Box::new(output),
            Err(e) => {
                warn!(error = %e, "audio unavailable, continuing silently");
                Box::new(NullOutput::new())
            }
        }
    }
    #[cfg(not(feature = "playback"))]
    {
        let _ = (events, volume);
        warn!("built without the `playback` feature, continuing silently");
        Box::new(NullOutput::new())
    }
}
