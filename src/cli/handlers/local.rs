use std::path::Path;

use chrono::{DateTime, Utc};

use crate::cli::commands::*;
use crate::io::config_io;
use crate::io::journal;
use crate::io::state::{self, CliState};

use super::{CmdResult, describe_dir, print_json};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

pub fn cmd_config(args: ConfigCmd, dir: &Path, json: bool) -> CmdResult {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = config_io::load_config(dir)?;
            if json {
                print_json(&config)
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        }
        ConfigAction::Init(init) => {
            let path = config_io::init_config(dir, init.force)?;
            println!("{}", describe_dir(&path).display());
            Ok(())
        }
        ConfigAction::Set(set) => {
            let (_, mut doc) = config_io::read_config(dir)?;
            config_io::set_key(&mut doc, &set.key, &set.value)?;
            config_io::write_config(dir, &doc)?;
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", config_io::config_path(&describe_dir(dir)).display());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Sync journal
// ---------------------------------------------------------------------------

pub fn cmd_journal(args: JournalCmd, dir: &Path, json: bool) -> CmdResult {
    match args.action {
        Some(JournalAction::Path) => {
            println!("{}", journal::journal_path(&describe_dir(dir)).display());
            Ok(())
        }
        Some(JournalAction::Prune(prune)) => {
            let before = prune.before.as_deref().map(parse_timestamp).transpose()?;
            let removed = journal::prune(dir, before, prune.all)?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }))
            } else {
                println!("removed {} entries", removed);
                Ok(())
            }
        }
        None => {
            let entries = journal::read_entries(dir, Some(args.limit.unwrap_or(10)));
            if json {
                let values: Vec<_> = entries.iter().map(|e| e.to_json()).collect();
                return print_json(&values);
            }
            if entries.is_empty() {
                println!("journal is empty");
            }
            for entry in &entries {
                print!("{}", entry.to_markdown());
            }
            Ok(())
        }
    }
}

/// Accept full RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC)
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid timestamp: {} (expected RFC 3339 or YYYY-MM-DD)", s))
}

// ---------------------------------------------------------------------------
// Drag
// ---------------------------------------------------------------------------

pub fn cmd_cancel(dir: &Path) -> CmdResult {
    let mut saved = state::read_state(dir).unwrap_or_default();
    if saved.drag.cancel() {
        state::write_state(dir, &CliState { drag: saved.drag })?;
        println!("drag cancelled");
    } else {
        println!("nothing is being dragged");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2026-03-01").unwrap().to_rfc3339(),
            "2026-03-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_timestamp("2026-03-01T12:30:00+02:00").unwrap().to_rfc3339(),
            "2026-03-01T10:30:00+00:00"
        );
        assert!(parse_timestamp("last week").is_err());
    }
}
