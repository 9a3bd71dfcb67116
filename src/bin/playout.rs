//! Usage: playout [games] [max_plies] [seed]
//!
//! Plays seeded random games through the rules engine and prints a JSON
//! report. Exits non-zero if the engine contradicts itself.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use chess_rules::playout::{run, PlayoutConfig};

    let mut config = PlayoutConfig::default();
    let args: Vec<String> = std::env::args().skip(1).collect();

    let parse = |idx: usize, name: &str| -> Option<u64> {
        let raw = args.get(idx)?;
        match raw.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                eprintln!("invalid {name}: {raw}");
                std::process::exit(2);
            }
        }
    };
    if let Some(games) = parse(0, "games") {
        config.games = games as usize;
    }
    if let Some(max_plies) = parse(1, "max_plies") {
        config.max_plies = max_plies as usize;
    }
    if let Some(seed) = parse(2, "seed") {
        config.seed = seed;
    }

    match run(&config) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to encode report: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
