mod render;
mod repl;

use anyhow::bail;
use beats_core::view::ViewState;
use beats_core::{BeatsCore, FieldUpdate, Intent};
use beats_proto::config::Config;
use beats_proto::protocol::Song;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "beats", about = "Client for the Beats collaborative jukebox", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "BEATS_URL",
        help = "Backend base URL (overrides the config file)"
    )]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Follow the player and read commands from stdin (default)
    Watch,
    /// Search songs; `artist:<name>` lists albums, `album:<name>` an album
    Search {
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// List random songs
    Random,
    /// Show the upcoming queue
    Queue,
    /// Show now playing, volume and session
    Status,
    /// Vote for a song
    Vote(VoteArgs),
    /// Set the volume (0-100)
    Volume { level: f64 },
    /// Toggle pause
    Pause,
    /// Skip to the next song
    Skip,
    /// Show or adjust the equalizer
    Eq {
        #[command(subcommand)]
        action: Option<EqAction>,
    },
    /// Start a session
    Login {
        username: String,
        #[arg(long, env = "BEATS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show the logged-in user
    Whoami,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct VoteArgs {
    /// Catalogue id
    #[arg(long)]
    id: Option<u64>,
    /// Stream URL
    #[arg(long)]
    url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum EqAction {
    On,
    Off,
    Preset { index: usize },
    Preamp {
        #[arg(allow_hyphen_values = true)]
        db: f64,
    },
    Band {
        band: usize,
        #[arg(allow_hyphen_values = true)]
        db: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = beats_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = beats_proto::platform::log_path();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG overrides; HTTP client internals stay quiet by default.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();
    eprintln!("beats log: {}", log_path.display());
    tracing::info!("beats starting…");

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config: {:#}, using defaults", e);
        Config::default()
    });
    if let Some(url) = cli.url {
        config.backend.base_url = url;
    }

    match cli.command.unwrap_or(Cmd::Watch) {
        Cmd::Watch => repl::watch(config).await,
        cmd => one_shot(config, cmd).await,
    }
}

/// Run one command through the core, wait for its requests to finish and
/// print the outcome.
async fn one_shot(config: Config, cmd: Cmd) -> anyhow::Result<()> {
    let (event_tx, _event_rx) = mpsc::channel(16);
    let mut core = BeatsCore::new(config, event_tx)?;

    match cmd {
        Cmd::Watch => bail!("`watch` runs interactively"),
        Cmd::Search { query } => {
            core.handle_intent(Intent::Search(query.join(" ")));
            core.settle().await;
            print!("{}", render::listing(core.view()));
        }
        Cmd::Random => {
            core.handle_intent(Intent::RandomSongs);
            core.settle().await;
            print!("{}", render::song_table(core.view()));
        }
        Cmd::Queue => {
            learn_queue(&mut core).await;
            print!("{}", render::queue_table(core.view()));
        }
        Cmd::Status => {
            core.start();
            core.settle().await;
            print!("{}", repl::show(repl::Show::Status, core.view()));
            print!("{}", repl::show(repl::Show::User, core.view()));
        }
        Cmd::Vote(args) => {
            learn_queue(&mut core).await;
            let song = match (args.id, args.url) {
                (Some(id), _) => Song {
                    id: Some(id),
                    ..Default::default()
                },
                (None, Some(url)) => Song {
                    url: Some(url),
                    ..Default::default()
                },
                (None, None) => bail!("pass --id or --url"),
            };
            let key = song.key();
            core.handle_intent(Intent::Vote(song));
            let sent = key.is_some_and(|k| core.view().pending_votes.contains(&k));
            core.settle().await;
            report(core.view())?;
            if sent {
                println!("voted");
            } else {
                println!("not votable: already playing or voted for");
            }
        }
        Cmd::Volume { level } => {
            core.handle_intent(Intent::Set(FieldUpdate::Volume(level)));
            core.settle().await;
            report(core.view())?;
            println!("volume {}", core.view().player.volume());
        }
        Cmd::Pause => {
            core.handle_intent(Intent::Pause);
            core.settle().await;
        }
        Cmd::Skip => {
            core.handle_intent(Intent::Skip);
            core.settle().await;
        }
        Cmd::Eq { action } => {
            core.start();
            core.settle().await;
            if let Some(action) = action {
                let update = match action {
                    EqAction::On => FieldUpdate::EqEnabled(true),
                    EqAction::Off => FieldUpdate::EqEnabled(false),
                    EqAction::Preset { index } => {
                        if index >= core.view().equalizer.presets.len() {
                            bail!("no preset {}", index);
                        }
                        FieldUpdate::EqPreset(index)
                    }
                    EqAction::Preamp { db } => FieldUpdate::Preamp(db),
                    EqAction::Band { band, db } => {
                        if band >= core.view().equalizer.band_frequencies.len() {
                            bail!("no band {}", band);
                        }
                        FieldUpdate::Band(band, db)
                    }
                };
                core.handle_intent(Intent::Set(update));
                core.settle().await;
            }
            print!("{}", render::equalizer(core.view()));
        }
        Cmd::Login { username, password } => {
            core.handle_intent(Intent::Login { username, password });
            core.settle().await;
            report(core.view())?;
            print!("{}", repl::show(repl::Show::User, core.view()));
        }
        Cmd::Logout => {
            core.handle_intent(Intent::Logout);
            core.settle().await;
            report(core.view())?;
            println!("logged out");
        }
        Cmd::Whoami => {
            core.handle_intent(Intent::ValidateSession);
            core.settle().await;
            report(core.view())?;
            print!("{}", repl::show(repl::Show::User, core.view()));
        }
    }

    report(core.view())
}

/// Validate the session first so the queue carries this user's votes.
async fn learn_queue(core: &mut BeatsCore) {
    core.handle_intent(Intent::ValidateSession);
    core.settle().await;
    core.handle_intent(Intent::Refresh);
    core.settle().await;
}

/// Turn a notice or login prompt into an error exit.
fn report(view: &ViewState) -> anyhow::Result<()> {
    if let Some(notice) = &view.notice {
        bail!("{}", notice);
    }
    if view.login_prompt {
        bail!("login required: run `beats login <user>`");
    }
    Ok(())
}
