//! Plain player state. No I/O here, just the data and the small derivations
//! the footer needs.

use serde::{Deserialize, Serialize};

use crate::api::catalog::Track;

pub const DEFAULT_VOLUME: f64 = 0.5;

/// Playback axis, derived from the state rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

impl RepeatMode {
    /// `None -> One -> All -> None`
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::One,
            Self::One => Self::All,
            Self::All => Self::None,
        }
    }

    pub fn badge(self) -> &'static str {
        match self {
            Self::None => "",
            Self::One => "1",
            Self::All => "ALL",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }
}

/// Volume indicator buckets 🔈🔉🔊
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeIcon {
    Mute,
    Low,
    Mid,
    High,
}

impl VolumeIcon {
    pub fn for_volume(volume: f64) -> Self {
        if volume <= 0.0 {
            Self::Mute
        } else if volume < 0.3 {
            Self::Low
        } else if volume < 0.7 {
            Self::Mid
        } else {
            Self::High
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            Self::Mute => "fas fa-volume-mute",
            Self::Low => "fas fa-volume-off",
            Self::Mid => "fas fa-volume-down",
            Self::High => "fas fa-volume-up",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub current_track: Option<Track>,
    /// `-1` when nothing is selected.
    pub current_index: isize,
    pub is_playing: bool,
    pub volume: f64,
    pub last_volume: f64,
    pub current_time: f64,
    pub duration: f64,
    pub repeat_mode: RepeatMode,
    pub shuffle: bool,

    pub playlist: Vec<Track>,
    /// Order before shuffling; only meaningful while `shuffle` is on.
    pub original_playlist: Vec<Track>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_track: None,
            current_index: -1,
            is_playing: false,
            volume: DEFAULT_VOLUME,
            last_volume: DEFAULT_VOLUME,
            current_time: 0.0,
            duration: 0.0,
            repeat_mode: RepeatMode::None,
            shuffle: false,
            playlist: Vec::new(),
            original_playlist: Vec::new(),
        }
    }
}

impl PlayerState {
    pub fn playback(&self) -> PlaybackState {
        match (&self.current_track, self.is_playing) {
            (None, _) => PlaybackState::Stopped,
            (Some(_), true) => PlaybackState::Playing,
            (Some(_), false) => PlaybackState::Paused,
        }
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.playlist.iter().position(|t| t.id == id)
    }

    /// Progress through the current track, `0..=100`.
    pub fn progress_percent(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    pub fn volume_icon(&self) -> VolumeIcon {
        VolumeIcon::for_volume(self.volume)
    }

    /// True when there is nothing after the current index.
    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.playlist.len() as isize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_cycle_returns_to_none() {
        let mut mode = RepeatMode::default();
        let seen: Vec<_> = (0..3)
            .map(|_| {
                mode = mode.cycle();
                mode.badge()
            })
            .collect();
        assert_eq!(seen, vec!["1", "ALL", ""]);
        assert_eq!(mode, RepeatMode::None);
    }

    #[test]
    fn test_volume_icon_thresholds() {
        assert_eq!(VolumeIcon::for_volume(0.0), VolumeIcon::Mute);
        assert_eq!(VolumeIcon::for_volume(0.01), VolumeIcon::Low);
        assert_eq!(VolumeIcon::for_volume(0.29), VolumeIcon::Low);
        assert_eq!(VolumeIcon::for_volume(0.3), VolumeIcon::Mid);
        assert_eq!(VolumeIcon::for_volume(0.69), VolumeIcon::Mid);
        assert_eq!(VolumeIcon::for_volume(0.7), VolumeIcon::High);
        assert_eq!(VolumeIcon::for_volume(1.0), VolumeIcon::High);
    }

    #[test]
    fn test_playback_is_derived() {
        let mut state = PlayerState::default();
        assert_eq!(state.playback(), PlaybackState::Stopped);
        state.current_track = Some(Track::new("1", "t", "a", 10.0));
        assert_eq!(state.playback(), PlaybackState::Paused);
        state.is_playing = true;
        assert_eq!(state.playback(), PlaybackState::Playing);
    }

    #[test]
    fn test_progress_percent_needs_duration() {
        let mut state = PlayerState::default();
        state.current_time = 30.0;
        assert_eq!(state.progress_percent(), 0.0);
        state.duration = 120.0;
        assert_eq!(state.progress_percent(), 25.0);
    }
}
