use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the task server, without a trailing slash
    #[serde(default = "default_url")]
    pub url: String,
    /// Session cookie value. Empty means no cookie is sent.
    #[serde(default)]
    pub session: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: default_url(),
            session: String::new(),
            cookie_name: default_cookie_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Deepest depth a node may occupy (top level is 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            max_depth: default_max_depth(),
        }
    }
}

/// What happens to optimistic state when a single-node mutation fails.
/// Failed moves always restore their snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackPolicy {
    /// Revert every failed mutation
    #[default]
    Uniform,
    /// Keep optimistic state until the next reconcile
    MovesOnly,
}

impl RollbackPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uniform" => Some(RollbackPolicy::Uniform),
            "moves-only" => Some(RollbackPolicy::MovesOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RollbackPolicy::Uniform => "uniform",
            RollbackPolicy::MovesOnly => "moves-only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub rollback: RollbackPolicy,
    /// Record failed confirmations in journal.log
    #[serde(default = "default_true")]
    pub journal: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            rollback: RollbackPolicy::default(),
            journal: true,
        }
    }
}

fn default_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// The original UI offered "add subtask" only on levels 0..3
fn default_max_depth() -> usize {
    3
}

fn default_true() -> bool {
    true
}
