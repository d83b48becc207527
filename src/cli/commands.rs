use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tn", about = concat!("tasknest v", env!("CARGO_PKG_VERSION"), " - nested task lists on a server"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different config directory
    #[arg(short = 'C', long = "config-dir", global = true)]
    pub config_dir: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Session cookie value (overrides server.session)
    #[arg(long, env = "TN_SESSION", global = true, hide_env_values = true)]
    pub session: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all lists with task counts
    Lists,
    /// Show one list's task tree
    Show(ShowArgs),
    /// Create a list
    AddList(AddListArgs),
    /// Rename a list
    RenameList(RenameListArgs),
    /// Delete a list and its tasks
    RmList(RmListArgs),
    /// Delete every list
    Clear(ClearArgs),
    /// Add a task to the top level of a list
    Add(AddArgs),
    /// Add a subtask under a task
    Sub(SubArgs),
    /// Flip a task between done and not done
    Toggle(TaskIdArgs),
    /// Change a task's text
    Edit(EditArgs),
    /// Delete a task and its subtasks
    Rm(TaskIdArgs),
    /// Move a task (with its subtasks) to another list
    Mv(MvArgs),
    /// Pick up a task to drop on another list
    Drag(DragArgs),
    /// Drop the dragged task on a list
    Drop(DropArgs),
    /// Abandon the current drag
    Cancel,
    /// Validate the fetched lists
    Check,
    /// End the server session
    Logout,
    /// View or manage the sync journal
    Journal(JournalCmd),
    /// View or edit configuration
    Config(ConfigCmd),
}

// ---------------------------------------------------------------------------
// List args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// List ID
    pub list: u64,
}

#[derive(Args)]
pub struct AddListArgs {
    /// List name
    pub name: String,
}

#[derive(Args)]
pub struct RenameListArgs {
    /// List ID
    pub list: u64,
    /// New name
    pub name: String,
}

#[derive(Args)]
pub struct RmListArgs {
    /// List ID
    pub list: u64,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Confirm deleting every list
    #[arg(long)]
    pub yes: bool,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// List ID
    pub list: u64,
    /// Task text
    pub text: String,
}

#[derive(Args)]
pub struct SubArgs {
    /// Parent task ID
    pub parent: u64,
    /// Subtask text
    pub text: String,
}

#[derive(Args)]
pub struct TaskIdArgs {
    /// Task ID
    pub id: u64,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: u64,
    /// New text
    pub text: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task ID
    pub id: u64,
    /// Destination list ID
    pub to: u64,
    /// Source list ID (default: the list holding the task)
    #[arg(long)]
    pub from: Option<u64>,
}

#[derive(Args)]
pub struct DragArgs {
    /// Task ID
    pub id: u64,
    /// Source list ID (default: the list holding the task)
    #[arg(long)]
    pub from: Option<u64>,
}

#[derive(Args)]
pub struct DropArgs {
    /// Destination list ID
    pub list: u64,
}

// ---------------------------------------------------------------------------
// Sync journal
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct JournalCmd {
    #[command(subcommand)]
    pub action: Option<JournalAction>,
    /// Maximum number of entries to show (default: 10)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand)]
pub enum JournalAction {
    /// Remove old entries
    Prune(JournalPruneArgs),
    /// Print the absolute path to the journal
    Path,
}

#[derive(Args)]
pub struct JournalPruneArgs {
    /// Remove entries older than this timestamp (default: 30 days ago)
    #[arg(long)]
    pub before: Option<String>,
    /// Remove all entries
    #[arg(long)]
    pub all: bool,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigCmd {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (default)
    Show,
    /// Write a default config.toml
    Init(ConfigInitArgs),
    /// Set one key, e.g. `tn config set server.url https://tasks.example.com`
    Set(ConfigSetArgs),
    /// Print the absolute path to config.toml
    Path,
}

#[derive(Args)]
pub struct ConfigInitArgs {
    /// Overwrite an existing config.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ConfigSetArgs {
    /// Dotted key, e.g. server.url
    pub key: String,
    pub value: String,
}
