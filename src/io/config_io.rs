use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::{Config, RollbackPolicy};

/// Written by `tn config init`
pub const DEFAULT_CONFIG: &str = r#"[server]
url = "http://localhost:4000"
# Session cookie value. TN_SESSION or --session override it.
session = ""
cookie_name = "session"
timeout_secs = 30

[tree]
# Deepest level a new subtask may be created at (top level is 0)
max_depth = 3

[sync]
# "uniform" undoes any refused change; "moves-only" only undoes moves
rollback = "uniform"
journal = true
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config directory: set TN_CONFIG_DIR, XDG_CONFIG_HOME or HOME")]
    NoConfigDir,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not parse config.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("config already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Keys accepted by `tn config set`
pub const KEYS: &[&str] = &[
    "server.url",
    "server.session",
    "server.cookie_name",
    "server.timeout_secs",
    "tree.max_depth",
    "sync.rollback",
    "sync.journal",
];

/// Pick the config directory: an explicit `--config-dir`, then
/// `TN_CONFIG_DIR`, then `$XDG_CONFIG_HOME/tasknest`, then
/// `$HOME/.config/tasknest`.
pub fn config_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_config_dir(explicit, |name| std::env::var(name).ok())
}

fn resolve_config_dir(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let var = |name: &str| env(name).filter(|v| !v.is_empty());
    if let Some(dir) = var("TN_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("tasknest"));
    }
    var("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("tasknest"))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join("config.toml")
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for formatting-preserving edits. A missing file reads
/// as the defaults and an empty document.
pub fn read_config(config_dir: &Path) -> Result<(Config, toml_edit::DocumentMut), ConfigError> {
    let path = config_path(config_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    let config: Config = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

pub fn load_config(config_dir: &Path) -> Result<Config, ConfigError> {
    read_config(config_dir).map(|(config, _)| config)
}

/// Write the document back to disk, preserving formatting.
pub fn write_config(config_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    fs::create_dir_all(config_dir)?;
    fs::write(config_path(config_dir), doc.to_string())?;
    Ok(())
}

/// Write `DEFAULT_CONFIG`. Refuses to overwrite unless `force`.
pub fn init_config(config_dir: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = config_path(config_dir);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }
    fs::create_dir_all(config_dir)?;
    fs::write(&path, DEFAULT_CONFIG)?;
    Ok(path)
}

/// Set `section.key` in the document. The value is checked against the
/// key's type before anything is written.
pub fn set_key(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let (section, name) = key
        .split_once('.')
        .filter(|_| KEYS.contains(&key))
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    let invalid = |message: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    };

    let value = match key {
        "server.timeout_secs" => match raw.parse::<i64>() {
            Ok(n) if n > 0 => toml_edit::value(n),
            _ => return Err(invalid("expected a positive integer")),
        },
        "tree.max_depth" => match raw.parse::<i64>() {
            Ok(n) if n >= 0 => toml_edit::value(n),
            _ => return Err(invalid("expected a non-negative integer")),
        },
        "sync.journal" => match raw.parse::<bool>() {
            Ok(b) => toml_edit::value(b),
            Err(_) => return Err(invalid("expected true or false")),
        },
        "sync.rollback" => match RollbackPolicy::parse(raw) {
            Some(policy) => toml_edit::value(policy.as_str()),
            None => return Err(invalid("expected \"uniform\" or \"moves-only\"")),
        },
        _ => toml_edit::value(raw),
    };

    if !doc.contains_key(section) {
        doc[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[section][name] = value;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn env_of<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_config_dir_precedence() {
        let vars = [
            ("TN_CONFIG_DIR", "/tmp/tn"),
            ("XDG_CONFIG_HOME", "/xdg"),
            ("HOME", "/home/me"),
        ];
        assert_eq!(
            resolve_config_dir(Some(Path::new("/explicit")), env_of(&vars)).unwrap(),
            PathBuf::from("/explicit")
        );
        assert_eq!(
            resolve_config_dir(None, env_of(&vars)).unwrap(),
            PathBuf::from("/tmp/tn")
        );
        assert_eq!(
            resolve_config_dir(None, env_of(&vars[1..])).unwrap(),
            PathBuf::from("/xdg/tasknest")
        );
        assert_eq!(
            resolve_config_dir(None, env_of(&[("XDG_CONFIG_HOME", ""), ("HOME", "/home/me")]))
                .unwrap(),
            PathBuf::from("/home/me/.config/tasknest")
        );
        assert!(matches!(
            resolve_config_dir(None, env_of(&[])),
            Err(ConfigError::NoConfigDir)
        ));
    }

    #[test]
    fn test_missing_config_reads_as_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_default_config_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("tasknest");
        let path = init_config(&dir, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
        assert!(matches!(
            init_config(&dir, false),
            Err(ConfigError::AlreadyExists(_))
        ));
        assert!(init_config(&dir, true).is_ok());
    }

    #[test]
    fn test_set_key_preserves_comments() {
        let tmp = TempDir::new().unwrap();
        init_config(tmp.path(), false).unwrap();
        let (_, mut doc) = read_config(tmp.path()).unwrap();
        set_key(&mut doc, "server.url", "https://tasks.example.com").unwrap();
        set_key(&mut doc, "sync.rollback", "moves-only").unwrap();
        write_config(tmp.path(), &doc).unwrap();

        let written = fs::read_to_string(config_path(tmp.path())).unwrap();
        assert!(written.contains("# Session cookie value."));
        assert!(written.contains("url = \"https://tasks.example.com\""));

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.server.url, "https://tasks.example.com");
        assert_eq!(config.sync.rollback, RollbackPolicy::MovesOnly);
        assert_eq!(config.tree.max_depth, 3);
    }

    #[test]
    fn test_set_key_creates_missing_section() {
        let mut doc = toml_edit::DocumentMut::new();
        set_key(&mut doc, "tree.max_depth", "5").unwrap();
        set_key(&mut doc, "sync.journal", "false").unwrap();
        let config: Config = toml::from_str(&doc.to_string()).unwrap();
        assert_eq!(config.tree.max_depth, 5);
        assert!(!config.sync.journal);
    }

    #[test]
    fn test_set_key_rejects_bad_input() {
        let mut doc = toml_edit::DocumentMut::new();
        assert!(matches!(
            set_key(&mut doc, "server.password", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            set_key(&mut doc, "server.timeout_secs", "0"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            set_key(&mut doc, "sync.rollback", "sometimes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            set_key(&mut doc, "sync.journal", "yes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(doc.to_string(), "");
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(config_path(tmp.path()), "[server\nurl = 1").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
