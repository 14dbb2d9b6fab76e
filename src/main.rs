//! Command line harness for the non-grid Othello engine.
//!
//! ## Usage
//!
//! - `nongrid-othello` - Show a demo on a 4x4 lattice
//! - `nongrid-othello demo` - Same
//! - `nongrid-othello self-play` - Let the computer play a full game

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::SubscriberBuilder;

use nongrid_othello::board::{Board, Player};
use nongrid_othello::coordinator::{SeatKind, TurnCoordinator};
use nongrid_othello::search::{SearchConfig, search};
use nongrid_othello::topology::TopologySpec;

/// Othello on arbitrary point sets
#[derive(Parser)]
#[command(name = "nongrid-othello")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log search and coordination detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show corridors, legal moves and one searched reply
    Demo {
        #[arg(long, default_value_t = 4)]
        size: usize,
    },
    /// Play a complete game through the turn coordinator
    SelfPlay {
        /// Lattice size, ignored with --topology
        #[arg(long, default_value_t = 6)]
        size: usize,
        /// JSON board description (points, adjacency, starting discs)
        #[arg(long)]
        topology: Option<PathBuf>,
        #[arg(long, default_value_t = 4)]
        depth: usize,
        /// Search budget per move in milliseconds
        #[arg(long, default_value_t = 500)]
        budget_ms: u64,
        /// White plays uniformly random legal moves
        #[arg(long)]
        random_white: bool,
        #[arg(long)]
        seed: Option<u64>,
        /// Print each move report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    SubscriberBuilder::default()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Demo { size }) => run_demo(size),
        Some(Commands::SelfPlay {
            size,
            topology,
            depth,
            budget_ms,
            random_white,
            seed,
            json,
        }) => {
            let board = match topology {
                Some(path) => load_board(&path)?,
                None => Board::grid(size)?,
            };
            let config = SearchConfig::default()
                .with_max_depth(depth)
                .with_budget(Duration::from_millis(budget_ms));
            self_play(board, config, random_white, seed, json)
        }
        None => run_demo(4),
    }
}

fn load_board(path: &Path) -> Result<Board> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading topology {}", path.display()))?;
    let spec: TopologySpec = serde_json::from_str(&text)
        .with_context(|| format!("parsing topology {}", path.display()))?;
    Board::from_spec(&spec).with_context(|| format!("resolving topology {}", path.display()))
}

fn run_demo(size: usize) -> Result<()> {
    println!("Non-grid Othello on a {size}x{size} lattice\n");

    let mut board = Board::grid(size)?;
    println!("=== Corridors ===");
    print!("{}", board.describe_corridors());
    println!();

    println!("=== Position ===");
    print!("{}", board.render_grid(size));
    println!("Black may play: {:?}\n", board.possible_moves());

    let config = SearchConfig::default().with_max_depth(4);
    let result = search(&board, Player::Black, &config).context("black has no move")?;
    let flipped = board.make_move(result.to)?;
    println!(
        "Black searches to depth {} and plays {} (value {}, {} flipped)",
        result.depth, result.to, result.value, flipped
    );
    print!("{}", board.render_grid(size));
    Ok(())
}

fn self_play(
    board: Board,
    config: SearchConfig,
    random_white: bool,
    seed: Option<u64>,
    json: bool,
) -> Result<()> {
    let white = if random_white {
        SeatKind::Human
    } else {
        SeatKind::Computer(config.clone())
    };
    let mut game = TurnCoordinator::new(board, SeatKind::Computer(config), white);
    let mut rng = match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };

    let reports = game.play_out(|board| {
        let moves = board.possible_moves();
        (!moves.is_empty()).then(|| moves[rng.usize(..moves.len())])
    })?;

    for report in &reports {
        if json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!(
                "{:>5} plays {:>3}, flips {:>2}  (X {} / O {})",
                report.player, report.to, report.flipped, report.scores.black, report.scores.white
            );
        }
    }

    let scores = game.board().scores();
    match scores.leader() {
        Some(winner) => println!(
            "{winner} wins {} to {} after {} moves",
            scores.of(winner),
            scores.of(winner.opponent()),
            reports.len()
        ),
        None => println!("draw at {} each after {} moves", scores.black, reports.len()),
    }
    Ok(())
}
