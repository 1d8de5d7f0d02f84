use checkers_arena::web::{ServerConfig, run_server};
use checkers_arena::*;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "checkers-arena", about = "Checkers engine with a heuristic computer player")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play the counterplay bot (blue) against a random bot (red)
    Play {
        #[arg(long, default_value_t = 200)]
        max_moves: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Serve the JSON API for playing against the computer
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Play {
        max_moves: 200,
        seed: None,
    }) {
        Command::Play { max_moves, seed } => play(max_moves, seed),
        Command::Serve { host, port, seed } => {
            let mut config = ServerConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_server(config, seed).await?;
        }
    }

    Ok(())
}

fn play(max_moves: usize, seed: Option<u64>) {
    println!("Checkers Arena - Bot Match");
    println!("==========================\n");

    let (blue, red): (Box<dyn Bot>, Box<dyn Bot>) = match seed {
        Some(seed) => (
            Box::new(CounterplayBot::with_seed("Counterplay".to_string(), seed)),
            Box::new(RandomBot::with_seed("Random".to_string(), seed.wrapping_add(1))),
        ),
        None => (
            Box::new(CounterplayBot::new("Counterplay".to_string())),
            Box::new(RandomBot::new("Random".to_string())),
        ),
    };

    let config = MatchConfig {
        time_per_move: Duration::from_secs(2),
        max_moves,
    };

    let mut match_game = Match::new(blue, red, config);
    let result = match_game.play();

    println!("{}", match_game.state().display_board());
    println!("==========================");
    println!("Match Result:");
    match result {
        MatchResult::BlueWins { winner_name, moves } => {
            println!("  {} wins as Blue in {} moves!", winner_name, moves);
        }
        MatchResult::RedWins { winner_name, moves } => {
            println!("  {} wins as Red in {} moves!", winner_name, moves);
        }
        MatchResult::Draw { moves } => {
            println!("  Draw after {} moves", moves);
        }
        MatchResult::Timeout { violator, winner } => {
            println!("  {} wins by timeout (opponent: {})", winner, violator);
        }
        MatchResult::IllegalMove { violator, winner } => {
            println!("  {} wins by illegal move (opponent: {})", winner, violator);
        }
    }
    println!("==========================");
}
