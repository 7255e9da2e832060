use clap::{Parser, Subcommand};

/// Swara - catalog browser and player for your terminal 🎵
#[derive(Parser, Debug)]
#[command(name = "swara", version, about)]
pub struct Args {
    /// API base URL (overrides config.toml)
    #[arg(long)]
    pub api: Option<String>,

    /// Template directory (overrides config.toml)
    #[arg(long)]
    pub templates: Option<String>,

    /// Keep the audio device closed
    #[arg(long)]
    pub no_audio: bool,

    /// Generate default config.toml to stdout
    #[arg(long)]
    pub generate_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Render the home page (all albums, popular, new releases)
    Home,
    /// Render one album with its tracks
    Album { id: String },
    /// List artists
    Artists,
    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show who is signed in
    Whoami,
    /// Open an album and start the interactive player
    Play {
        album_id: String,
        /// Start from this track instead of the first one
        #[arg(long)]
        track: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_with_track() {
        let args = Args::parse_from(["swara", "--no-audio", "play", "a1", "--track", "t3"]);
        assert!(args.no_audio);
        assert_eq!(
            args.command,
            Some(Command::Play {
                album_id: "a1".into(),
                track: Some("t3".into())
            })
        );
    }

    #[test]
    fn test_parse_overrides() {
        let args = Args::parse_from(["swara", "--api", "http://x/api", "--templates", "views", "home"]);
        assert_eq!(args.api.as_deref(), Some("http://x/api"));
        assert_eq!(args.templates.as_deref(), Some("views"));
        assert_eq!(args.command, Some(Command::Home));
    }

    #[test]
    fn test_parse_login() {
        let args = Args::parse_from(["swara", "login", "--email", "a@b.c", "--password", "pw"]);
        assert_eq!(
            args.command,
            Some(Command::Login {
                email: "a@b.c".into(),
                password: "pw".into()
            })
        );
    }
}
