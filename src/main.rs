//! Ultimate Tic-Tac-Toe engine driver
//!
//! Reads one command per line on stdin and writes one reply per line on
//! stdout. Logs go to stderr (`RUST_LOG`, default `info`).
//!
//! ```text
//! new x|o [81 cell codes]   start a game, optionally from a position feed
//! move <XY>                 opponent's move (A0 = we open); reply is our move
//! retry                     our last move was rejected; reply is another move
//! over                      game finished
//! quit
//! ```

use std::io::{self, BufRead, Write};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use uttt::{AIEngine, Agent, EngineConfig, EngineError, Mark};

/// One parsed input line.
#[derive(Debug, PartialEq)]
enum Command {
    New { mark: Mark, feed: Option<Vec<i32>> },
    Move(String),
    Retry,
    Over,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return Ok(None);
    };

    let command = match head {
        "new" => {
            let mark = match parts.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
                Some("x") => Mark::X,
                Some("o") => Mark::O,
                _ => return Err("usage: new x|o [81 cell codes]".into()),
            };
            let feed = if parts.len() > 2 {
                let codes = parts[2..]
                    .iter()
                    .map(|p| p.parse::<i32>().map_err(|_| format!("bad cell code {:?}", p)))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(codes)
            } else {
                None
            };
            Command::New { mark, feed }
        }
        "move" => match parts.get(1) {
            Some(notation) => Command::Move((*notation).to_string()),
            None => return Err("usage: move <XY>".into()),
        },
        "retry" => Command::Retry,
        "over" => Command::Over,
        "quit" => Command::Quit,
        other => return Err(format!("unknown command {:?}", other)),
    };
    Ok(Some(command))
}

fn execute(agent: &mut Agent, command: Command) -> Result<Option<String>, EngineError> {
    match command {
        Command::New { mark, feed } => {
            agent.start(mark, feed.as_deref())?;
            Ok(Some("ok".into()))
        }
        Command::Move(notation) => agent.opponent_moved(&notation).map(Some),
        Command::Retry => agent.retry().map(Some),
        Command::Over => {
            agent.game_over();
            Ok(Some("ok".into()))
        }
        Command::Quit => Ok(None),
    }
}

fn run(mut agent: Agent) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let reply = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => match execute(&mut agent, command) {
                Ok(Some(reply)) => reply,
                Ok(None) => continue,
                Err(err) => format!("error: {}", err),
            },
            Err(msg) => format!("error: {}", msg),
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    agent.game_over();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(%path, %err, "failed to load configuration");
                std::process::exit(2);
            }
        },
        None => EngineConfig::default(),
    };

    let engine = match AIEngine::with_config(config) {
        Ok(engine) => engine,
        Err(err) => {
            error!(%err, "failed to start engine");
            std::process::exit(2);
        }
    };
    info!(threads = engine.config().worker_threads(), "engine ready");

    if let Err(err) = run(Agent::new(engine)) {
        error!(%err, "input loop failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_new_without_feed() {
        assert_eq!(
            parse_command("new X").unwrap(),
            Some(Command::New {
                mark: Mark::X,
                feed: None
            })
        );
    }

    #[test]
    fn test_parse_new_with_feed() {
        let mut line = String::from("new o");
        for i in 0..81 {
            line.push_str(if i == 40 { " 4" } else { " 0" });
        }
        match parse_command(&line).unwrap() {
            Some(Command::New { mark, feed: Some(feed) }) => {
                assert_eq!(mark, Mark::O);
                assert_eq!(feed.len(), 81);
                assert_eq!(feed[40], 4);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(parse_command("  ").unwrap(), None);
        assert_eq!(
            parse_command("move E5").unwrap(),
            Some(Command::Move("E5".into()))
        );
        assert_eq!(parse_command("retry").unwrap(), Some(Command::Retry));
        assert_eq!(parse_command("over").unwrap(), Some(Command::Over));
        assert_eq!(parse_command("quit").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("new z").is_err());
        assert!(parse_command("move").is_err());
        assert!(parse_command("new x 1 two").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn test_execute_session() {
        let config = EngineConfig {
            time_limit_ms: 150,
            start_depth: 1,
            max_depth: 3,
            tt_size_mb: 2,
            threads: 2,
            ..EngineConfig::default()
        };
        let mut agent = Agent::new(AIEngine::with_config(config).unwrap());
        let started = execute(&mut agent, parse_command("new x").unwrap().unwrap()).unwrap();
        assert_eq!(started.as_deref(), Some("ok"));

        let reply = execute(&mut agent, Command::Move("A0".into())).unwrap().unwrap();
        assert_eq!(reply.len(), 2);
        assert!(matches!(
            execute(&mut agent, Command::Move("??".into())),
            Err(EngineError::Notation { .. })
        ));
        assert_eq!(execute(&mut agent, Command::Quit).unwrap(), None);
    }
}
