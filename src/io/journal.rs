use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::sync::{SyncError, SyncRequest};

/// Size above which entries are trimmed on append (1 MB).
const MAX_LOG_SIZE: usize = 1_048_576;

/// Default number of days before entries are prunable.
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Written at the top of a new journal.
const FILE_HEADER: &str = "\
<!-- tasknest sync journal: backend requests that did not go through
     View with: tn journal
     Prune old entries: tn journal prune
     Safe to delete. -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One failed backend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    /// `SyncRequest::kind`
    pub kind: String,
    pub error: String,
    /// Target ids and values of the request
    pub fields: Vec<(String, String)>,
    /// Whether local state was rolled back
    pub reverted: bool,
}

impl JournalEntry {
    pub fn new(request: &SyncRequest, error: &SyncError, reverted: bool) -> Self {
        JournalEntry {
            timestamp: Utc::now(),
            kind: request.kind().to_string(),
            error: one_line(&error.to_string()),
            fields: request
                .fields()
                .into_iter()
                .map(|(key, value)| (key, one_line(&value)))
                .collect(),
            reverted,
        }
    }
}

/// Entries are line-oriented
fn one_line(s: &str) -> String {
    s.lines().collect::<Vec<_>>().join(" ")
}

pub fn journal_path(config_dir: &Path) -> PathBuf {
    config_dir.join("journal.log")
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

impl JournalEntry {
    /// Markdown block as stored in the journal
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} {}: {}\n\n",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.kind,
            self.error,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        out.push_str(&format!(
            "rollback: {}\n",
            if self.reverted { "reverted" } else { "kept" }
        ));
        out.push_str("\n---\n");
        out
    }

    /// For `tn journal --json`
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "kind": self.kind,
            "error": self.error,
            "fields": fields,
            "reverted": self.reverted,
        })
    }
}

// ---------------------------------------------------------------------------
// Appending
// ---------------------------------------------------------------------------

/// Record a failed request. Write errors are logged, never returned.
pub fn log_failure(config_dir: &Path, request: &SyncRequest, error: &SyncError, reverted: bool) {
    let entry = JournalEntry::new(request, error, reverted);
    if let Err(e) = append(config_dir, &entry) {
        warn!(error = %e, "could not write to sync journal");
    }
}

pub fn append(config_dir: &Path, entry: &JournalEntry) -> io::Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let path = journal_path(config_dir);

    if let Ok(meta) = std::fs::metadata(&path)
        && meta.len() > MAX_LOG_SIZE as u64
    {
        let content = std::fs::read_to_string(&path)?;
        let trimmed = trim_oversized(&content, Utc::now(), MAX_LOG_SIZE);
        atomic_write(&path, trimmed.as_bytes())?;
    }

    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Entries, most recent first. A missing journal reads as empty.
pub fn read_entries(config_dir: &Path, limit: Option<usize>) -> Vec<JournalEntry> {
    let content = match std::fs::read_to_string(journal_path(config_dir)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    let mut entries = parse_entries(&content);
    if let Some(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries.reverse();
    entries
}

fn parse_entries(content: &str) -> Vec<JournalEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some((timestamp, kind, error)) = line.strip_prefix("## ").and_then(parse_header)
        else {
            continue;
        };
        let mut fields = Vec::new();
        let mut reverted = false;
        for line in lines.by_ref() {
            if line == "---" {
                break;
            }
            let Some((key, value)) = line.trim().split_once(": ") else {
                continue;
            };
            if key == "rollback" {
                reverted = value == "reverted";
            } else {
                fields.push((key.to_string(), value.to_string()));
            }
        }
        entries.push(JournalEntry {
            timestamp,
            kind,
            error,
            fields,
            reverted,
        });
    }
    entries
}

/// `<timestamp> <kind>: <error>`
fn parse_header(header: &str) -> Option<(DateTime<Utc>, String, String)> {
    let (timestamp, rest) = header.split_once(' ')?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Utc);
    let (kind, error) = rest.split_once(": ")?;
    Some((timestamp, kind.to_string(), error.to_string()))
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Drop entries older than `before` (default: `PRUNE_AGE_DAYS` ago), or
/// every entry with `all`. Returns the number removed.
pub fn prune(config_dir: &Path, before: Option<DateTime<Utc>>, all: bool) -> io::Result<usize> {
    let path = journal_path(config_dir);
    if !path.exists() {
        return Ok(0);
    }
    let content = std::fs::read_to_string(&path)?;
    let original = parse_entries(&content).len();

    let trimmed = if all {
        FILE_HEADER.to_string()
    } else {
        let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
        prune_entries_before(&content, &cutoff)
    };
    let remaining = parse_entries(&trimmed).len();
    atomic_write(&path, trimmed.as_bytes())?;
    Ok(original - remaining)
}

/// Remove entries stamped before `cutoff`, keeping the file header.
fn prune_entries_before(content: &str, cutoff: &DateTime<Utc>) -> String {
    let (mut result, entries) = split_entries(content);
    for entry in entries {
        if entry_time(&entry).is_some_and(|ts| ts >= *cutoff) {
            result.push_str(&entry);
        }
    }
    result
}

/// Drop entries older than `PRUNE_AGE_DAYS`. If that is not enough, drop
/// the oldest of the rest until the file is at most half of `max_bytes`.
fn trim_oversized(content: &str, now: DateTime<Utc>, max_bytes: usize) -> String {
    let cutoff = now - chrono::Duration::days(PRUNE_AGE_DAYS);
    let recent = prune_entries_before(content, &cutoff);
    let target = max_bytes / 2;
    if recent.len() <= target {
        return recent;
    }

    let (mut result, entries) = split_entries(&recent);
    let mut budget = target.saturating_sub(result.len());
    let mut kept = Vec::new();
    for entry in entries.iter().rev() {
        if entry.len() > budget {
            break;
        }
        budget -= entry.len();
        kept.push(entry);
    }
    for entry in kept.into_iter().rev() {
        result.push_str(entry);
    }
    result
}

/// The file header and the text of each entry, oldest first
fn split_entries(content: &str) -> (String, Vec<String>) {
    let mut header = String::new();
    let mut entries: Vec<String> = Vec::new();
    let mut in_header = true;

    for line in content.lines() {
        if in_header {
            header.push_str(line);
            header.push('\n');
            if line == "---" {
                in_header = false;
            }
            continue;
        }
        if line.starts_with("## ") || entries.is_empty() {
            entries.push(String::new());
        }
        if let Some(current) = entries.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }
    (header, entries)
}

fn entry_time(entry: &str) -> Option<DateTime<Utc>> {
    let header = entry.lines().next()?.strip_prefix("## ")?;
    parse_header(header).map(|(ts, _, _)| ts)
}
