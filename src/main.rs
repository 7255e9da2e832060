use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use swara::app::cli::{Args, Command};
use swara::app::{logging, App, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    human_panic::setup_panic!();
    let args = Args::parse();

    if args.generate_config {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    // 1. Logging 📝 (guard lives until main returns)
    let _log_guard = match logging::init(&AppConfig::get_log_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {e}");
            None
        }
    };

    // 2. Config (flags win over config.toml)
    let config = AppConfig::load().with_overrides(args.api.as_deref(), args.templates.as_deref());
    info!(api = %config.api_base_url, templates = %config.templates_dir, "starting swara");

    // 3. Wire the app
    let command = args.command.unwrap_or(Command::Home);
    let wants_audio = matches!(command, Command::Play { .. }) && !args.no_audio;
    let (mut app, player_events) = App::from_config(config, wants_audio)?;
    app.echo_toasts = true;

    // 4. Dispatch 🎛️
    match command {
        Command::Home => {
            if let Some(html) = app.show_home().await {
                println!("{html}");
            }
        }
        Command::Album { id } => {
            if app.open_album(&id).await {
                println!("{}", app.browser.content());
            }
        }
        Command::Artists => {
            if let Some(list) = app.artists().await {
                for artist in &list.artists {
                    let name = artist.get("name").and_then(|n| n.as_str()).unwrap_or("?");
                    println!("{name}");
                }
            }
        }
        Command::Login { email, password } => {
            let _ = app.login(&email, &password).await;
        }
        Command::Signup { email, password } => {
            let _ = app.signup(&email, &password).await;
        }
        Command::Logout => {
            let _ = app.logout().await;
        }
        Command::Whoami => match app.whoami() {
            Some(email) => println!("{email}"),
            None => println!("not signed in"),
        },
        Command::Play { album_id, track } => {
            if !app.open_album(&album_id).await {
                error!(album = %album_id, "cannot start player without an album");
                return Ok(());
            }
            match track {
                Some(id) => app.play_track_by_id(&id),
                None => app.play_first_track(),
            }
            println!("{}", app.status_line());
            app.run(player_events).await?;
        }
    }

    Ok(())
}
