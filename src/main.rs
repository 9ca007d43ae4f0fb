//! Tabula: a rule-configurable board game engine.
//!
//! ## Usage
//!
//! - `tabula` - Show a demo
//! - `tabula games` - List the built-in games
//! - `tabula moves <game>` - Show the starting position and its legal moves
//! - `tabula selfplay <game>` - Let the engine play itself
//! - `tabula serve <game>` - Start the text protocol on stdin/stdout

use std::io;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use tabula::constants::{DEFAULT_EXPLORATION, DEFAULT_ITERATIONS, DEFAULT_TEMPERATURE};
use tabula::evaluator::UniformEvaluator;
use tabula::play::play_game;
use tabula::protocol::Session;
use tabula::registry::GameRegistry;
use tabula::search::{MonteCarloTreeSearch, RandomPlayer, SearchAlgo, SearchParams};
use tabula::strategy::{AlphaZeroStrategy, DirichletStrategy, VanillaStrategy};
use tabula::tree::GameTree;

/// Tabula: board games from declarative rules, played by tree search
#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a short demo search
    Demo,
    /// List the built-in games
    Games,
    /// Show the starting position of a game and its legal moves
    Moves { game: String },
    /// Play games of the engine against itself
    Selfplay {
        game: String,
        /// Number of games to play
        #[arg(long, default_value_t = 1)]
        games: usize,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Start the text command protocol on stdin/stdout
    Serve {
        game: String,
        #[command(flatten)]
        search: SearchArgs,
    },
}

#[derive(Args, Clone)]
struct SearchArgs {
    /// Search iterations per move
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    /// Exploration coefficient
    #[arg(long, default_value_t = DEFAULT_EXPLORATION)]
    exploration: f64,
    /// Move-picking temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f64,
    /// Start the temperature here and ramp it down over `--ramp-plies`
    #[arg(long, requires = "ramp_plies")]
    ramp_start: Option<f64>,
    #[arg(long)]
    ramp_plies: Option<u16>,
    /// Per-ply discount of backed up values
    #[arg(long)]
    discount: Option<f64>,
    /// Board reflections shown to the evaluator (1, 2 or 4)
    #[arg(long, default_value_t = 1)]
    reflections: usize,
    #[arg(long, value_enum, default_value_t = StrategyKind::Vanilla)]
    strategy: StrategyKind,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyKind {
    /// Random rollouts
    Vanilla,
    /// Evaluator priors and values (uniform evaluator)
    Alphazero,
    /// AlphaZero selection over rollout values
    AlphazeroRollout,
    /// Win/loss/draw pseudo-counts
    Dirichlet,
    /// Uniformly random moves
    Random,
}

impl SearchArgs {
    fn params(&self, seed: Option<u64>) -> SearchParams {
        let mut params = SearchParams::default()
            .with_iterations(self.iterations)
            .with_exploration(self.exploration)
            .with_temperature(self.temperature)
            .with_reflections(self.reflections);
        if let (Some(start), Some(plies)) = (self.ramp_start, self.ramp_plies) {
            params = params.with_temperature_ramp(start, plies);
        }
        if let Some(discount) = self.discount {
            params = params.with_depth_discount(discount);
        }
        params.seed = seed;
        params
    }

    fn algo(&self, seed: Option<u64>) -> Box<dyn SearchAlgo> {
        let params = self.params(seed);
        match self.strategy {
            StrategyKind::Vanilla => Box::new(MonteCarloTreeSearch::new(
                VanillaStrategy::new(params.clone()),
                &params,
            )),
            StrategyKind::Alphazero => Box::new(MonteCarloTreeSearch::new(
                AlphaZeroStrategy::new(UniformEvaluator, params.clone()),
                &params,
            )),
            StrategyKind::AlphazeroRollout => Box::new(MonteCarloTreeSearch::new(
                AlphaZeroStrategy::without_model(params.clone()),
                &params,
            )),
            StrategyKind::Dirichlet => Box::new(MonteCarloTreeSearch::new(
                DirichletStrategy::new(params.clone()),
                &params,
            )),
            StrategyKind::Random => Box::new(RandomPlayer::new(params.seed)),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let registry = GameRegistry::builtin();

    match cli.command {
        Some(Commands::Games) => {
            for name in registry.names() {
                let game = registry.create(name)?;
                println!("{name:<10} {} engine", game.engine().name());
            }
        }
        Some(Commands::Moves { game }) => show_moves(&registry, &game)?,
        Some(Commands::Selfplay { game, games, search }) => {
            selfplay(&registry, &game, games, &search)?
        }
        Some(Commands::Serve { game, search }) => {
            let mut session = Session::new(registry, &game, search.algo(search.seed))?;
            session.run(io::stdin().lock(), io::stdout().lock())?;
        }
        Some(Commands::Demo) | None => run_demo(&registry)?,
    }
    Ok(())
}

fn show_moves(registry: &GameRegistry, id: &str) -> Result<()> {
    let game = registry.create(id).with_context(|| format!("cannot build game `{id}`"))?;
    let mut tree = GameTree::new(game)?;
    let start = tree.start();
    println!("{}", tree.position(start)?.render(tree.game().rules()));
    let moves = tree.legal_moves(start)?;
    let mut names = Vec::with_capacity(moves.len());
    for &child in moves.iter() {
        names.push(tree.move_name(start, child)?);
    }
    println!("{} legal moves: {}", names.len(), names.join(" "));
    Ok(())
}

fn selfplay(registry: &GameRegistry, id: &str, games: usize, search: &SearchArgs) -> Result<()> {
    let mut results = [0usize; 3];
    let mut instances = 0;
    for i in 0..games {
        let seed = search.seed.map(|s| s.wrapping_add(2 * i as u64));
        let mut white = search.algo(seed);
        let mut black = search.algo(seed.map(|s| s.wrapping_add(1)));
        let mut tree = GameTree::new(registry.create(id)?)?;
        let record = play_game(&mut tree, &mut white, &mut black)
            .with_context(|| format!("game {} of {id} failed", i + 1))?;
        println!("{}", record.final_position.render(tree.game().rules()));
        println!(
            "game {}: {} after {} plies: {}",
            i + 1,
            record.result(),
            record.plies(),
            record.moves.join(" ")
        );
        let slot = match record.result() {
            "white" => 0,
            "black" => 1,
            _ => 2,
        };
        results[slot] += 1;
        instances += record.instances.len();
    }
    println!(
        "white {} / black {} / draw {}, {instances} training instances",
        results[0], results[1], results[2]
    );
    Ok(())
}

fn run_demo(registry: &GameRegistry) -> Result<()> {
    println!("Tabula: rule-configurable board games\n");

    println!("=== Tic-tac-toe ===");
    let params = SearchParams::default().with_iterations(200);
    let mut white = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
    let mut black = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
    let mut tree = GameTree::new(registry.create("tictactoe")?)?;
    let record = play_game(&mut tree, &mut white, &mut black)?;
    println!("{}", record.final_position.render(tree.game().rules()));
    println!("Moves: {}", record.moves.join(" "));
    println!("Result: {}\n", record.result());

    println!("=== Chess ===");
    let params = SearchParams::default().with_iterations(100);
    let mut search = MonteCarloTreeSearch::new(VanillaStrategy::new(params.clone()), &params);
    let mut tree = GameTree::new(registry.create("chess2")?)?;
    let start = tree.start();
    println!("Running 100 search iterations...");
    let (next, _) = search.next(&mut tree, start)?;
    println!("Best move: {}", tree.move_name(start, next)?);
    Ok(())
}
