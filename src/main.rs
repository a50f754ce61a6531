//! TonCasino command line
//!
//! Plays single bets against a simulated balance, runs simulations and prints
//! the effective configuration.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use toncasino::{
    config::{CasinoConfig, ConfigLoader},
    errors::{CasinoError, CasinoResult, ConfigurationError},
    games::{GameType, PlayerIdentity, Prediction, VrfGameEngine, VrfRandomSource},
    simulation::{simulate, SimulationPlan},
    stats::DEFAULT_LEADERBOARD_SIZE,
    BetMode, Casino, LeaderboardKind,
};
use tracing::info;

/// TonCasino CLI
#[derive(Parser)]
#[command(name = "toncasino")]
#[command(about = "Coinflip, dice and crash bet settlement engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the demo table preset when no file is given
    #[arg(long)]
    demo: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Settle one or more bets in a fresh session
    Play {
        /// coinflip, dice or crash
        #[arg(short, long)]
        game: GameType,

        /// heads/tails, low/high, or a crash target such as 2.5x
        #[arg(short, long)]
        prediction: String,

        /// Stake; defaults to the configured bet amount
        #[arg(short, long)]
        amount: Option<f64>,

        /// Spend a trial play instead of balance
        #[arg(long)]
        trial: bool,

        /// Number of consecutive bets
        #[arg(short, long, default_value = "1")]
        rounds: usize,

        /// Draw from the VRF engine and print the proofs
        #[arg(long)]
        provably_fair: bool,
    },

    /// Estimate win rate and return to player
    Simulate {
        #[arg(short, long)]
        game: GameType,

        #[arg(short, long)]
        prediction: String,

        #[arg(short, long, default_value = "10000")]
        rounds: usize,

        #[arg(short, long, default_value = "1.0")]
        stake: f64,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        provably_fair: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> CasinoResult<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path).load()?,
        None if cli.demo => CasinoConfig::demo(),
        None => ConfigLoader::new().load()?,
    };

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Play {
            game,
            prediction,
            amount,
            trial,
            rounds,
            provably_fair,
        } => {
            let prediction = parse_prediction(game, &prediction)?;
            run_play(config, prediction, amount, trial, rounds, provably_fair).await
        }
        Commands::Simulate {
            game,
            prediction,
            rounds,
            stake,
            seed,
            provably_fair,
        } => {
            let prediction = parse_prediction(game, &prediction)?;
            let mut plan = SimulationPlan::new(prediction, rounds, stake);
            plan.seed = seed;
            plan.provably_fair = provably_fair;
            run_simulation(config, plan).await
        }
        Commands::Config { output } => print_config(&config, output),
    }
}

fn init_logging(config: &CasinoConfig, verbose: bool) {
    if !config.monitoring.enable_logging {
        return;
    }
    let default_directive = if verbose {
        "debug"
    } else {
        config.monitoring.log_level.as_directive()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .init();
}

fn parse_prediction(game: GameType, raw: &str) -> CasinoResult<Prediction> {
    Prediction::parse(game, raw).map_err(|reason| {
        CasinoError::Configuration(ConfigurationError::InvalidValue {
            field: "prediction".to_string(),
            value: raw.to_string(),
            reason,
        })
    })
}

async fn run_play(
    config: CasinoConfig,
    prediction: Prediction,
    amount: Option<f64>,
    trial: bool,
    rounds: usize,
    provably_fair: bool,
) -> CasinoResult<()> {
    let casino = Casino::new(config)?;
    let identity = PlayerIdentity::new("cli", "cli-player");

    let mut session = casino.new_session().with_identity(identity);
    let mut proofs = None;
    if provably_fair {
        let engine = Arc::new(VrfGameEngine::new_random());
        println!("🔑 VRF public key: {}", engine.public_key_hex());
        let source = VrfRandomSource::new(engine, "cli");
        proofs = Some(source.proof_log());
        session = session.with_random(Box::new(source));
    }
    let session = casino
        .attach_session(session)
        .ok_or_else(|| ConfigurationError::MissingRequired("player identity".to_string()))?;

    if let Some(amount) = amount {
        session.set_bet_amount(amount).await?;
    }

    info!(game = %prediction.game_type(), %prediction, rounds, "Starting play");

    for round in 1..=rounds {
        let mode = if trial {
            BetMode::Trial
        } else {
            BetMode::Real(amount.unwrap_or_else(|| session.bet_amount()))
        };
        let bet = session.place_bet(prediction, mode).await?;

        let verdict = if bet.is_win() { "WIN " } else { "LOSE" };
        println!(
            "#{:<3} {} {:?} stake {:.2} payout {:.2} balance {:.2}",
            round,
            verdict,
            bet.game_data,
            bet.amount,
            bet.payout,
            session.balance()
        );
    }

    if let Some(log) = proofs {
        for bundle in log.take() {
            let valid = VrfGameEngine::verify_vrf_proof(&bundle, &bundle.input_message)?;
            println!(
                "🔐 {} output {} valid {}",
                bundle.input_message, bundle.vrf_output, valid
            );
        }
    }

    if let Some(stats) = session.stats() {
        println!(
            "📊 bets {} wins {} losses {} net {:.2}",
            stats.total_bets, stats.total_wins, stats.total_losses, stats.net_profit
        );
    }
    for achievement in session.achievements().iter().filter(|a| a.unlocked) {
        println!("🏆 {}", achievement.title);
    }
    for (rank, entry) in casino
        .leaderboard(LeaderboardKind::Profit, DEFAULT_LEADERBOARD_SIZE)
        .iter()
        .enumerate()
    {
        println!("{:>2}. {} {:+.2}", rank + 1, entry.username, entry.net_profit);
    }

    if casino.config().monitoring.enable_metrics {
        println!("📈 {}", serde_json::to_string(&casino.metrics())?);
    }

    Ok(())
}

async fn run_simulation(config: CasinoConfig, plan: SimulationPlan) -> CasinoResult<()> {
    let report = simulate(&config, &plan).await?;

    println!("🎲 {} / {}", report.game, report.prediction);
    println!("   Rounds:        {}", report.rounds);
    println!("   Wins:          {}", report.wins);
    println!("   Win rate:      {:.4}", report.win_rate);
    println!("   Wagered:       {:.2}", report.total_wagered);
    println!("   Paid out:      {:.2}", report.total_paid_out);
    println!("   RTP:           {:.4}", report.rtp);
    println!("   House edge:    {:.4}", report.house_edge);
    if plan.provably_fair {
        println!("   VRF verified:  {}", report.vrf_verifications);
    }
    println!("   Elapsed:       {:?}", report.execution_time);

    Ok(())
}

fn print_config(config: &CasinoConfig, output: Option<PathBuf>) -> CasinoResult<()> {
    match output {
        Some(path) => {
            ConfigLoader::new().save(config, &path.to_string_lossy())?;
            println!("✅ Configuration written to {}", path.display());
        }
        None => {
            let rendered = toml::to_string_pretty(config)
                .map_err(|e| ConfigurationError::SaveFailed(e.to_string()))?;
            println!("{}", rendered);
        }
    }
    Ok(())
}
