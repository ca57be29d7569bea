/// Tonearm - terminal music player
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tonearm_audio_desktop::DesktopPlayback;
use tonearm_cli::{probe, session, CliConfig};
use tonearm_playback::TrackHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tonearm")]
#[command(about = "Play local audio files with a live spectrum meter", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./tonearm.toml if present)
    #[arg(short, long, global = true, env = "TONEARM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play files in order, reading commands from stdin
    Play {
        /// Audio files to queue
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Initial volume (0.0-1.0)
        #[arg(long)]
        volume: Option<f32>,

        /// Start with shuffle enabled
        #[arg(long)]
        shuffle: bool,

        /// Wrap around at the end of the playlist
        #[arg(long)]
        repeat: bool,

        /// Hide the status line and spectrum meter
        #[arg(long)]
        no_meter: bool,

        /// Keep running after the playlist ends
        #[arg(long)]
        stay: bool,
    },
    /// Print duration, format and estimated bitrate of files
    Probe {
        /// Audio files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't tear the status line
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,tonearm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Play {
            files,
            volume,
            shuffle,
            repeat,
            no_meter,
            stay,
        } => {
            if let Some(volume) = volume {
                config.playback.volume = volume;
            }
            config.playback.shuffle |= shuffle;
            config.playback.repeat |= repeat;
            config.ui.show_meter &= !no_meter;
            config.ui.exit_at_end &= !stay;
            config.validate()?;

            play(&config, files)?;
        }
        Commands::Probe { files } => {
            let mut failures = 0;
            for file in &files {
                match probe::probe(file, &config.playback) {
                    Ok(report) => println!("{report}"),
                    Err(e) => {
                        failures += 1;
                        eprintln!("{}: {e}", file.display());
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} of {} files could not be opened", files.len());
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn play(config: &CliConfig, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let playback =
        DesktopPlayback::new(config.desktop()).context("Failed to open audio output")?;
    tracing::info!("Queued {} tracks", files.len());

    let lines = session::spawn_stdin_reader()?;
    let mut session = session::Session::new(playback, config.ui.clone());
    session.start(files.iter().map(TrackHandle::from_path).collect())?;
    println!("type 'help' for commands");
    session.run(lines)?;
    Ok(())
}
