//! Terminal front end of a courtside device.
//!
//! `keeper` reads scoring commands from stdin; `display` follows a match given
//! its pairing payload (or the remembered one) and redraws on every update.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtside::{
    config::AppConfig,
    dao::{kv::FileKeyValueStore, local_store::LocalStore},
    dto::scoreboard::{ScoreboardView, ScreenSide},
    services::{
        controller::{Controller, ScanOutcome},
        scanner::{Camera, CameraError, CameraSession},
    },
    state::Side,
};

const KEEPER_HELP: &str = "\
commands:
  p1 | p2            point for side 1 / 2
  u1 | u2            undo a point of side 1 / 2
  s1 | s2            add a set to side 1 / 2
  x1 | x2            remove a set from side 1 / 2
  serve <1|2>        choose the opening server (only at 0-0)
  override <1|2>     force the current server
  name <1|2> <text>  rename a side
  next <1|2>         award the set and start the next one
  code               show the pairing code
  summary            print the match summary
  new                start a new match
  mirror             swap left and right
  help | quit";

/// Courtside scoreboard device.
#[derive(Parser, Debug)]
#[command(name = "courtside-device")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory of the device-local store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Relay base URL; enables cross-device sync
    #[arg(long, global = true)]
    relay: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Keep the score of the current match
    Keeper,

    /// Follow a match as a read-only scoreboard
    Display {
        /// Scanned pairing payload (bare id or display link); resumes the last match when omitted
        code: Option<String>,

        /// Show side 2 on the left
        #[arg(long)]
        mirrored: bool,
    },
}

/// Stand-in camera: payloads are typed instead of scanned, access is always granted.
struct TerminalCamera;

struct TerminalSession;

impl CameraSession for TerminalSession {
    fn release(&mut self) {}
}

impl Camera for TerminalCamera {
    fn open(&self) -> Result<Box<dyn CameraSession>, CameraError> {
        Ok(Box::new(TerminalSession))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(relay) = cli.relay {
        config.relay_url = Some(relay);
    }

    let store = LocalStore::new(Arc::new(FileKeyValueStore::new(
        config.data_dir.join("device"),
    )));
    let mut controller = Controller::from_config(&config, store);

    let outcome = match cli.command {
        Commands::Keeper => run_keeper(&mut controller).await,
        Commands::Display { code, mirrored } => {
            run_display(&mut controller, code.as_deref(), mirrored).await
        }
    };

    controller.shutdown().await;
    outcome
}

async fn run_keeper(controller: &mut Controller) -> Result<()> {
    let id = controller.keeper().await?.id().clone();
    println!("keeping match {id} via {} sync", controller.transport_name());
    println!("{KEEPER_HELP}");

    let mut mirrored = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_view(&controller.view(mirrored));

    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let target = controller.pairing_target().clone();
        let session = controller.keeper().await?;

        match words.as_slice() {
            [] => continue,
            ["quit" | "exit"] => break,
            ["help"] => println!("{KEEPER_HELP}"),
            ["p1"] => session.score_point(Side::One),
            ["p2"] => session.score_point(Side::Two),
            ["u1"] => session.remove_point(Side::One),
            ["u2"] => session.remove_point(Side::Two),
            ["s1"] => session.add_set(Side::One),
            ["s2"] => session.add_set(Side::Two),
            ["x1"] => session.remove_set(Side::One),
            ["x2"] => session.remove_set(Side::Two),
            ["serve", side] => match parse_side(side) {
                Some(side) => session.set_server_at_start(side),
                None => eprintln!("side must be 1 or 2"),
            },
            ["override", side] => match parse_side(side) {
                Some(side) => session.override_server(side),
                None => eprintln!("side must be 1 or 2"),
            },
            ["next", side] => match parse_side(side) {
                Some(side) => session.next_set(side),
                None => eprintln!("side must be 1 or 2"),
            },
            ["name", side, rest @ ..] => match parse_side(side) {
                Some(side) => session.set_name(side, &rest.join(" ")),
                None => eprintln!("side must be 1 or 2"),
            },
            ["code"] => {
                let code = session.pairing_code(&target);
                println!("{}", code.render()?);
                println!("{}", code.payload());
                continue;
            }
            ["summary"] => {
                print!("{}", session.summary());
                continue;
            }
            ["new"] => {
                controller.start_new_match().await?;
                let id = controller.keeper().await?.id().clone();
                println!("started match {id}");
            }
            ["mirror"] => mirrored = !mirrored,
            _ => {
                eprintln!("unknown command `{line}` (try `help`)");
                continue;
            }
        }

        print_view(&controller.view(mirrored));
    }

    Ok(())
}

async fn run_display(controller: &mut Controller, code: Option<&str>, mirrored: bool) -> Result<()> {
    let id = match code {
        Some(code) => {
            controller.start_scanning(&TerminalCamera)?;
            match controller.handle_scan(code).await? {
                ScanOutcome::Paired(id) => id,
                ScanOutcome::KeepScanning | ScanOutcome::NotScanning => {
                    controller.cancel_scanning()?;
                    bail!("`{code}` is not a match code");
                }
            }
        }
        None => controller.resume_display().await?,
    };
    println!("following match {id} via {} sync (Ctrl+C to stop)", controller.transport_name());

    let mut updates = controller.display_updates();
    print_view(&controller.view(mirrored));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_view(&controller.view(mirrored));
            }
        }
    }

    controller.leave_display().await?;
    Ok(())
}

fn parse_side(raw: &str) -> Option<Side> {
    raw.parse::<u8>().ok().and_then(|n| Side::try_from(n).ok())
}

fn print_view(view: &ScoreboardView) {
    if let Some(placeholder) = &view.placeholder {
        println!("{placeholder}");
        return;
    }
    let (left_mark, right_mark) = match view.serving_side {
        ScreenSide::Left => ("*", " "),
        ScreenSide::Right => (" ", "*"),
    };
    println!(
        "{left_mark} {:<20} [{}] {:>2}  -  {:<2} [{}] {:>20} {right_mark}",
        view.left_name, view.left_set, view.left_score, view.right_score, view.right_set, view.right_name,
    );
}

/// Log to stderr so the scoreboard owns stdout.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
