use std::fs::File;

use debrid_streams::config::{self, Config};
use debrid_streams::content::{ContentKind, is_imdb_id};
use debrid_streams::{doctor, tui};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: debrid-streams [doctor | <imdb-id> [movie|series]]";

#[tokio::main]
async fn main() {
    // Log to a file so output doesn't interfere with the TUI
    let log_path = std::env::temp_dir().join("debrid-streams.log");
    let log_file = File::create(&log_path).ok();

    if let Some(file) = log_file {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_target(false)
            .with_ansi(false)
            .with_writer(file)
            .init();
    } else {
        // Fallback to stderr if can't create log file
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_target(false)
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            if let config::ConfigError::NotFound(path) = &e {
                eprintln!("\nCreate a config file at: {}", path.display());
                eprintln!("\nExample config.toml:");
                eprintln!(
                    r#"
[sources]
aiostreams = "https://aiostreams.example.com/stremio/<uuid>/<config>/manifest.json"
# comet = "https://comet.example.com/<config>/manifest.json"
# torrentio = "https://torrentio.strem.fun/<options>/manifest.json"

[player]
command = "mpv"

# [trakt]
# enabled = true
# client_id = "..."
# access_token = "..."
"#
                );
            }
            std::process::exit(1);
        }
    };

    let initial = match args.first().map(String::as_str) {
        None => None,
        Some("doctor") => {
            let results = doctor::run_checks(&config).await;
            doctor::print_results(&results);
            return;
        }
        Some("-h") | Some("--help") => {
            println!("{}", USAGE);
            return;
        }
        Some(id) if is_imdb_id(id) => {
            let kind = args
                .get(1)
                .and_then(|k| ContentKind::from_addon_type(k))
                .unwrap_or(ContentKind::Movie);
            Some(tui::lookup_title(id, kind == ContentKind::Series))
        }
        Some(other) => {
            eprintln!("Unknown argument: {}\n{}", other, USAGE);
            std::process::exit(2);
        }
    };

    info!(log = %log_path.display(), "starting debrid-streams");

    if let Err(e) = tui::run(config, initial).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
