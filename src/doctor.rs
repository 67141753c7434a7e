use crate::config::Config;
use crate::content::ContentKind;
use crate::source::Backend;
use crate::store::AppState;

/// Title used to probe the metadata addon
const PROBE_SERIES: &str = "tt0903747";

pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
        }
    }

    fn warning(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
        }
    }

    fn error(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "✓",
            CheckStatus::Warning => "⚠",
            CheckStatus::Error => "✗",
        }
    }

    pub fn color(&self) -> &'static str {
        match self.status {
            CheckStatus::Ok => "\x1b[32m",      // green
            CheckStatus::Warning => "\x1b[33m", // yellow
            CheckStatus::Error => "\x1b[31m",   // red
        }
    }
}

pub async fn run_checks(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let configured = config.sources.configured();
    if configured.is_empty() {
        results.push(CheckResult::error(
            "Sources",
            "No stream addon configured. Set [sources] aiostreams, comet or torrentio.",
        ));
    }
    for backend in configured {
        results.push(check_source(config, backend).await);
    }

    results.push(check_metadata(config).await);

    if config.trakt.enabled {
        results.push(check_trakt(config).await);
    }

    results.push(check_player(config));
    results.push(check_state());

    results
}

async fn check_source(config: &Config, backend: Backend) -> CheckResult {
    let client = config.sources.client(backend);

    match client.fetch_manifest().await {
        Ok(manifest) => {
            let name = manifest.name.unwrap_or_else(|| backend.title().to_string());
            CheckResult::ok(
                backend.title(),
                &format!("{} reachable, {} catalogs", name, manifest.catalogs.len()),
            )
        }
        Err(e) => CheckResult::error(backend.title(), &format!("Manifest failed: {}", e)),
    }
}

async fn check_metadata(config: &Config) -> CheckResult {
    let Some(client) = config.metadata_client() else {
        return CheckResult::warning(
            "Metadata",
            "Disabled. Series default to 20 episodes per season.",
        );
    };

    match client.fetch_meta(ContentKind::Series, PROBE_SERIES).await {
        Ok(_) => CheckResult::ok("Metadata", &format!("{} reachable", client.base_url())),
        Err(e) => CheckResult::warning("Metadata", &format!("Lookup failed: {}", e)),
    }
}

async fn check_trakt(config: &Config) -> CheckResult {
    let Some(client) = config.trakt.client() else {
        return CheckResult::error("Trakt", "Enabled but client_id or access_token missing");
    };

    match client.watchlist(1).await {
        Ok(_) => CheckResult::ok("Trakt", "Access token valid"),
        Err(e) => CheckResult::error("Trakt", &format!("API error: {}", e)),
    }
}

fn check_player(config: &Config) -> CheckResult {
    let player = &config.player.command;

    match which::which(player) {
        Ok(path) => CheckResult::ok("Player", &format!("{} found at {}", player, path.display())),
        Err(_) => CheckResult::error("Player", &format!("'{}' not found in PATH", player)),
    }
}

fn check_state() -> CheckResult {
    let Some(path) = AppState::state_path() else {
        return CheckResult::warning("State", "No data directory; source choice won't persist");
    };
    let Some(dir) = path.parent() else {
        return CheckResult::warning("State", "Invalid state path");
    };

    match std::fs::create_dir_all(dir) {
        Ok(_) => {
            let test_file = dir.join(".debrid_streams_test");
            match std::fs::write(&test_file, "test") {
                Ok(_) => {
                    let _ = std::fs::remove_file(&test_file);
                    CheckResult::ok("State", &format!("Data dir: {}", dir.display()))
                }
                Err(e) => CheckResult::warning("State", &format!("Data dir not writable: {}", e)),
            }
        }
        Err(e) => CheckResult::warning("State", &format!("Cannot create data dir: {}", e)),
    }
}

pub fn print_results(results: &[CheckResult]) {
    let reset = "\x1b[0m";

    println!("\ndebrid-streams doctor\n");

    for result in results {
        println!(
            "  {}{} {}{}  {}",
            result.color(),
            result.icon(),
            result.name,
            reset,
            result.message
        );
    }

    println!();

    let errors = results
        .iter()
        .filter(|r| r.status == CheckStatus::Error)
        .count();
    let warnings = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warning)
        .count();

    if errors > 0 {
        println!("  {} error(s), {} warning(s)", errors, warnings);
        println!("  Fix errors above to use debrid-streams.\n");
    } else if warnings > 0 {
        println!(
            "  {} warning(s) - debrid-streams will work with limited features.\n",
            warnings
        );
    } else {
        println!("  All checks passed!\n");
    }
}
