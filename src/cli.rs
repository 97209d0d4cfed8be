//! Command-line surface
//!
//! One invocation analyzes one video. Afterwards an interactive prompt lets
//! the user regenerate the thumbnail in the other ratio, reset, or quit.

use crate::gateway::AspectRatio;
use crate::render;
use crate::session::{Phase, RegenerationOutcome, SessionController, SkipReason};
use crate::storage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "viralyze", version, about = "Analyze a short video and generate viral titles, captions and a thumbnail")]
pub(crate) struct Args {
    /// Video to analyze (max 50MB)
    pub(crate) video: PathBuf,

    /// Thumbnail aspect ratio: 9:16 (portrait) or 16:9 (landscape)
    #[arg(long, default_value = "9:16", value_parser = parse_aspect_ratio)]
    pub(crate) aspect: AspectRatio,

    /// Directory for generated thumbnails
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,

    /// Open each saved thumbnail with the system viewer
    #[arg(long)]
    pub(crate) open: bool,

    /// Exit after the first run instead of prompting
    #[arg(long)]
    pub(crate) no_interactive: bool,

    /// Also report skipped regenerations and resets
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

fn parse_aspect_ratio(value: &str) -> Result<AspectRatio, String> {
    value.parse()
}

/// Follow-up commands accepted at the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Ratio(AspectRatio),
    Toggle,
    Show,
    Reset,
    Quit,
    Help,
}

impl Command {
    pub(crate) fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let argument = words.next();

        match (command.as_str(), argument) {
            ("ratio" | "r", Some(value)) => value.parse().map(Command::Ratio),
            ("ratio" | "r", None) => Err("usage: ratio 9:16|16:9".to_string()),
            ("toggle" | "t", _) => Ok(Command::Toggle),
            ("show" | "s", _) => Ok(Command::Show),
            ("reset", _) => Ok(Command::Reset),
            ("quit" | "q" | "exit", _) => Ok(Command::Quit),
            ("help" | "?" | "", _) => Ok(Command::Help),
            (other, _) => Err(format!("unknown command '{}', try 'help'", other)),
        }
    }
}

const HELP: &str = "Commands:
  ratio 9:16|16:9   regenerate the thumbnail in that aspect ratio
  toggle            regenerate in the other aspect ratio
  show              print the current results again
  reset             discard the results and exit
  quit              exit";

/// Where and how thumbnails are written
pub(crate) struct Output {
    pub(crate) dir: PathBuf,
    pub(crate) stem: String,
    pub(crate) open: bool,
}

impl Output {
    /// Save the current thumbnail, if any, and optionally open it
    pub(crate) fn save_current(&self, controller: &SessionController) {
        let state = controller.snapshot();
        let Some(image) = state.thumbnail_image.as_deref() else {
            return;
        };

        match storage::save_thumbnail(image, &self.dir, &self.stem, state.aspect_ratio) {
            Ok(path) => {
                println!("Thumbnail saved to {}", path.display());
                if self.open {
                    open_file(&path);
                }
            }
            Err(e) => error!("Failed to save thumbnail: {}", e),
        }
    }
}

fn open_file(path: &Path) {
    if let Err(e) = open::that(path) {
        error!("Failed to open {}: {}", path.display(), e);
    }
}

/// Prompt loop after a run; returns when the user quits, resets or stdin closes
pub(crate) async fn run_interactive(controller: &SessionController, output: &Output) {
    println!("\n{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                break;
            }
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            Command::Ratio(ratio) => regenerate(controller, output, ratio).await,
            Command::Toggle => {
                let ratio = controller.snapshot().aspect_ratio.toggled();
                regenerate(controller, output, ratio).await;
            }
            Command::Show => println!("{}", render::render_state(&controller.snapshot())),
            Command::Reset => {
                controller.reset();
                println!("Session cleared.");
                break;
            }
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
        }
    }
}

async fn regenerate(controller: &SessionController, output: &Output, ratio: AspectRatio) {
    match controller.regenerate_thumbnail(ratio).await {
        RegenerationOutcome::Regenerated => {
            info!(aspect_ratio = %ratio, "Thumbnail regenerated");
            output.save_current(controller);
        }
        RegenerationOutcome::Skipped(SkipReason::NoAnalysis) => {
            println!("Nothing to regenerate yet: analyze a video first.");
        }
        RegenerationOutcome::Skipped(SkipReason::AlreadyRunning | SkipReason::PipelineRunning) => {
            println!("A thumbnail is already being generated.");
        }
        // Reported through the session event channel
        RegenerationOutcome::Failed(_) => {}
    }
}

/// Whether the run left anything worth following up on
pub(crate) fn has_results(controller: &SessionController) -> bool {
    let state = controller.snapshot();
    state.analysis.is_some() && matches!(state.phase, Phase::Completed | Phase::Error)
}
