use crate::player::PlayerEvent;

use super::shell::ShellCommand;

/// Everything the interactive loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Input(ShellCommand),
    Player(PlayerEvent),
    Tick,
}
