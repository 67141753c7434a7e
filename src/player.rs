use std::collections::BTreeMap;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use url::Url;

use crate::content::TitleMeta;
use crate::view::StreamEntry;

/// Sent when the stream carries no User-Agent of its own
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Stream URL not found")]
    NoUrl,
    #[error("failed to launch {0}: {1}")]
    Launch(String, String),
}

/// Where playback is handed off.
///
/// `Native` players get Referer/User-Agent synthesized for debrid CDNs that
/// check them; `Web` hands the URL to the player the user picked last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerContext {
    #[default]
    Native,
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
    pub title: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Player command overriding the configured one
    pub player: Option<String>,
}

fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// `scheme://host[:port]/` of an http(s) URL
fn referer_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    Some(format!("{}/", parsed.origin().ascii_serialization()))
}

pub fn build_play_request(
    entry: &StreamEntry,
    meta: &TitleMeta,
    context: PlayerContext,
    last_player: Option<&str>,
) -> Result<PlayRequest, PlayerError> {
    let url = entry.url().ok_or(PlayerError::NoUrl)?.to_string();

    let title = match &entry.tag.quality {
        Some(quality) => format!("{} [{}]", meta.display_title(), quality),
        None => meta.display_title().to_string(),
    };

    let mut headers: BTreeMap<String, String> = entry
        .candidate
        .proxy_request_headers()
        .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let player = match context {
        PlayerContext::Native => {
            if !has_header(&headers, "Referer")
                && let Some(referer) = referer_for(&url)
            {
                headers.insert("Referer".to_string(), referer);
            }
            if !has_header(&headers, "User-Agent") {
                headers.insert("User-Agent".to_string(), USER_AGENT.to_string());
            }
            None
        }
        PlayerContext::Web => last_player.filter(|p| !p.is_empty()).map(str::to_string),
    };

    Ok(PlayRequest {
        title,
        url,
        headers,
        player,
    })
}

/// Arguments passed to `command` for a request, player-specific flags first
pub fn player_args(command: &str, request: &PlayRequest, extra: &[String]) -> Vec<String> {
    let mut args = Vec::new();

    if command.contains("mpv") {
        args.push(format!("--force-media-title={}", request.title));
        args.push("--really-quiet".to_string());
        for (name, value) in &request.headers {
            args.push(format!("--http-header-fields-append={}: {}", name, value));
        }
    } else if command.contains("vlc") {
        args.push(format!("--meta-title={}", request.title));
        for (name, value) in &request.headers {
            if name.eq_ignore_ascii_case("Referer") {
                args.push(format!("--http-referrer={}", value));
            } else if name.eq_ignore_ascii_case("User-Agent") {
                args.push(format!("--http-user-agent={}", value));
            }
        }
    }

    args.extend(extra.iter().cloned());
    args.push(request.url.clone());
    args
}

pub fn launch_player(command: &str, extra_args: &[String], request: &PlayRequest) -> Result<Child, PlayerError> {
    let command = request.player.as_deref().unwrap_or(command);
    let args = player_args(command, request, extra_args);
    debug!(command, title = %request.title, headers = request.headers.len(), "launching player");

    let mut cmd = Command::new(command);
    cmd.args(&args);

    // Keep the player from drawing over the TUI
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = cmd
        .spawn()
        .map_err(|e| PlayerError::Launch(command.to_string(), e.to_string()))?;

    info!(command, title = %request.title, "player started");
    Ok(child)
}

/// Reap the player in the background so it does not linger as a zombie
pub fn watch_player(mut child: Child) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(%status, "player exited"),
            Err(e) => warn!(error = %e, "failed to wait for player"),
        }
    });
}
