//! Line-oriented operator console on stdin

use offline_queue_core::application::OfflineQueue;
use offline_queue_core::domain::{ActionKind, DomainError, QueueItem};
use offline_queue_core::port::ManualNetworkMonitor;
use std::fmt::Write as _;

pub const HELP: &str = "\
Commands:
  enqueue <bounty|message> <json>   queue an action
  list [bounty|message]             show queued items
  stats                             queue counters
  retry <id>                        reset a failed item and drain
  remove <id>                       drop an item
  clear-failed                      drop every failed item
  online | offline                  set connectivity (manual mode only)
  help                              this text
  quit                              exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Enqueue {
        kind: ActionKind,
        payload: serde_json::Value,
    },
    List(Option<ActionKind>),
    Stats,
    Retry(String),
    Remove(String),
    ClearFailed,
    SetOnline(bool),
    Help,
    Quit,
}

/// Parse one input line; Ok(None) for blank lines
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "enqueue" => {
            let (kind, json) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: enqueue <bounty|message> <json>")?;
            let kind = parse_kind(kind)?;
            let payload = serde_json::from_str(json.trim())
                .map_err(|e| format!("invalid JSON payload: {}", e))?;
            Command::Enqueue { kind, payload }
        }
        "list" | "ls" => {
            if rest.is_empty() {
                Command::List(None)
            } else {
                Command::List(Some(parse_kind(rest)?))
            }
        }
        "stats" => Command::Stats,
        "retry" => Command::Retry(required_id(rest, "retry")?),
        "remove" | "rm" => Command::Remove(required_id(rest, "remove")?),
        "clear-failed" => Command::ClearFailed,
        "online" => Command::SetOnline(true),
        "offline" => Command::SetOnline(false),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {} (try 'help')", other)),
    };
    Ok(Some(command))
}

fn parse_kind(s: &str) -> Result<ActionKind, String> {
    s.parse::<ActionKind>().map_err(|e| e.to_string())
}

fn required_id(rest: &str, verb: &str) -> Result<String, String> {
    match rest.split_whitespace().next() {
        Some(id) => Ok(id.to_string()),
        None => Err(format!("usage: {} <id>", verb)),
    }
}

/// Reply text plus whether the console should exit
pub struct Reply {
    pub text: String,
    pub quit: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

/// Apply a command to the queue
///
/// `manual_network` is None when connectivity comes from the TCP probe.
pub async fn execute(
    command: Command,
    queue: &OfflineQueue,
    manual_network: Option<&ManualNetworkMonitor>,
) -> Reply {
    match command {
        Command::Enqueue { kind, payload } => {
            let item = queue.enqueue(kind, payload.into()).await;
            Reply::text(format!("queued {} ({})", item.id, item.kind))
        }
        Command::List(kind) => {
            let items = match kind {
                Some(kind) => queue.get_queue_by_kind(kind),
                None => queue.get_queue(),
            };
            Reply::text(format_items(&items))
        }
        Command::Stats => {
            let stats = queue.stats();
            let mut text = format!(
                "pending={} processing={} failed={} online={}",
                stats.pending,
                stats.processing,
                stats.failed,
                queue.is_online()
            );
            if let Some(oldest) = stats.oldest_pending {
                let _ = write!(text, " oldest_pending={}", oldest);
            }
            Reply::text(text)
        }
        Command::Retry(id) => {
            if queue.retry_item(&id).await {
                Reply::text(format!("retrying {}", id))
            } else {
                Reply::text(not_found(&id))
            }
        }
        Command::Remove(id) => {
            if queue.remove_item(&id).await {
                Reply::text(format!("removed {}", id))
            } else {
                Reply::text(not_found(&id))
            }
        }
        Command::ClearFailed => {
            let removed = queue.clear_failed_items().await;
            Reply::text(format!("cleared {} failed item(s)", removed))
        }
        Command::SetOnline(online) => match manual_network {
            Some(network) => {
                network.set_online(online);
                Reply::text(if online { "online" } else { "offline" })
            }
            None => Reply::text("connectivity is probed automatically (network.mode = probe)"),
        },
        Command::Help => Reply::text(HELP),
        Command::Quit => Reply {
            text: "bye".to_string(),
            quit: true,
        },
    }
}

fn not_found(id: &str) -> String {
    format!("{} (or it is being submitted)", DomainError::ItemNotFound(id.to_string()))
}

fn format_items(items: &[QueueItem]) -> String {
    if items.is_empty() {
        return "queue is empty".to_string();
    }

    let mut out = String::new();
    for item in items {
        let _ = write!(
            out,
            "{}  {:<8} {:<10} retries={} payload={}",
            item.id, item.kind, item.status, item.retry_count, item.payload.as_value()
        );
        if let Some(error) = &item.last_error {
            let _ = write!(out, " last_error={:?}", error);
        }
        out.push('\n');
    }
    out.pop();
    out
}
