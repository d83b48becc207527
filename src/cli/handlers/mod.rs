mod local;

use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::state::{self, CliState};
use crate::model::config::Config;
use crate::model::task::{ListId, TaskId};
use crate::ops::check;
use crate::store::{ListStore, Session, StoreError};
use crate::sync::HttpClient;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let dir = config_io::config_dir(cli.config_dir.as_deref().map(Path::new))?;

    match cli.command {
        // Local commands never touch the server
        Commands::Config(args) => local::cmd_config(args, &dir, json),
        Commands::Journal(args) => local::cmd_journal(args, &dir, json),
        Commands::Cancel => local::cmd_cancel(&dir),

        Commands::Clear(ClearArgs { yes: false }) => {
            Err("refusing to delete every list without --yes".into())
        }

        command => {
            let config = load_config(&dir, cli.session)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_remote(command, &dir, config, json))
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(dir: &Path, session: Option<String>) -> Result<Config, config_io::ConfigError> {
    let mut config = config_io::load_config(dir)?;
    if let Some(session) = session {
        config.server.session = session;
    }
    Ok(config)
}

fn open_session(dir: &Path, config: &Config) -> Result<Session<HttpClient>, Box<dyn std::error::Error>> {
    let client = HttpClient::new(&config.server)?;
    let mut session = Session::new(client, ListStore::from_config(config));
    if config.sync.journal {
        session = session.with_journal(dir.to_path_buf());
    }
    if let Some(saved) = state::read_state(dir) {
        session = session.with_drag(saved.drag);
    }
    Ok(session)
}

fn save_drag(dir: &Path, session: &Session<HttpClient>) -> CmdResult {
    state::write_state(
        dir,
        &CliState {
            drag: session.drag(),
        },
    )?;
    Ok(())
}

/// The list holding `task`, unless the caller named one
fn source_list(
    session: &Session<HttpClient>,
    task: TaskId,
    from: Option<u64>,
) -> Result<ListId, StoreError> {
    match from {
        Some(id) => Ok(ListId(id)),
        None => session
            .store()
            .owner_of(task)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", task))),
    }
}

fn print_json(value: &impl serde::Serialize) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the node after a change, or its id under --json
fn print_task(session: &Session<HttpClient>, task_id: TaskId, json: bool) -> CmdResult {
    if json {
        return match session.store().find_task(task_id) {
            Some(task) => print_json(task),
            None => print_json(&serde_json::json!({ "id": task_id })),
        };
    }
    match session.store().find_task(task_id) {
        Some(task) => println!("{}", format_task_line(task)),
        None => println!("{}", task_id),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Remote commands
// ---------------------------------------------------------------------------

async fn run_remote(command: Commands, dir: &Path, config: Config, json: bool) -> CmdResult {
    let mut session = open_session(dir, &config)?;
    // Start every command from the server's current data
    if !matches!(command, Commands::Logout) {
        session.refresh().await?;
    }

    match command {
        Commands::Logout => {
            session.logout().await?;
            state::write_state(dir, &CliState::default())?;
            if !json {
                println!("logged out");
            }
            Ok(())
        }
        Commands::Lists => cmd_lists(&session, json),
        Commands::Show(args) => cmd_show(&session, args, json),
        Commands::Check => cmd_check(&session, json),

        Commands::AddList(args) => {
            let id = session.add_list(&args.name).await?;
            if json {
                print_json(&serde_json::json!({ "id": id }))
            } else {
                println!("{}", id);
                Ok(())
            }
        }
        Commands::RenameList(args) => {
            session.rename_list(ListId(args.list), &args.name).await?;
            Ok(())
        }
        Commands::RmList(args) => {
            session.delete_list(ListId(args.list)).await?;
            Ok(())
        }
        Commands::Clear(_) => {
            session.delete_all_lists().await?;
            Ok(())
        }

        Commands::Add(args) => {
            let id = session.add_task(ListId(args.list), &args.text).await?;
            print_task(&session, id, json)
        }
        Commands::Sub(args) => {
            let id = session.add_subtask(TaskId(args.parent), &args.text).await?;
            print_task(&session, id, json)
        }
        Commands::Toggle(args) => {
            session.toggle_complete(TaskId(args.id)).await?;
            print_task(&session, TaskId(args.id), json)
        }
        Commands::Edit(args) => {
            session.edit_text(TaskId(args.id), &args.text).await?;
            print_task(&session, TaskId(args.id), json)
        }
        Commands::Rm(args) => {
            session.delete_task(TaskId(args.id)).await?;
            Ok(())
        }
        Commands::Mv(args) => cmd_mv(&mut session, args, json).await,

        Commands::Drag(args) => {
            let task = TaskId(args.id);
            let from = source_list(&session, task, args.from)?;
            session.begin_drag(task, Some(from))?;
            save_drag(dir, &session)
        }
        Commands::Drop(args) => cmd_drop(&mut session, dir, args, json).await,

        Commands::Cancel | Commands::Config(_) | Commands::Journal(_) => {
            Err("local command sent to the server".into())
        }
    }
}

fn cmd_lists(session: &Session<HttpClient>, json: bool) -> CmdResult {
    if json {
        let lists: Vec<_> = session.store().lists().map(list_summary_json).collect();
        return print_json(&lists);
    }
    for list in session.store().lists() {
        println!("{}", format_list_summary(list));
    }
    Ok(())
}

fn cmd_show(session: &Session<HttpClient>, args: ShowArgs, json: bool) -> CmdResult {
    let list = session
        .store()
        .list(ListId(args.list))
        .ok_or_else(|| StoreError::NotFound(format!("list {}", args.list)))?;
    if json {
        return print_json(list);
    }
    for line in format_list(list) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_check(session: &Session<HttpClient>, json: bool) -> CmdResult {
    let result = check::check_lists(session.store().lists(), session.store().max_depth());
    if json {
        return print_json(&result);
    }
    for line in format_check(&result) {
        println!("{}", line);
    }
    Ok(())
}

async fn cmd_mv(session: &mut Session<HttpClient>, args: MvArgs, json: bool) -> CmdResult {
    let task = TaskId(args.id);
    let from = source_list(session, task, args.from)?;
    let to = ListId(args.to);
    let moved = session.move_task(task, from, to).await?;
    if json {
        return print_json(&serde_json::json!({ "id": task, "list_id": to, "moved": moved }));
    }
    if !moved {
        println!("task {} is already in list {}", task, to);
    }
    Ok(())
}

async fn cmd_drop(
    session: &mut Session<HttpClient>,
    dir: &Path,
    args: DropArgs,
    json: bool,
) -> CmdResult {
    let dragged = session
        .drag()
        .dragged()
        .ok_or("nothing is being dragged (start with `tn drag <task>`)")?;
    let result = session.drop_on(ListId(args.list)).await;
    // The drag is over whether or not the move went through
    save_drag(dir, session)?;
    let moved = result?;
    if json {
        return print_json(&serde_json::json!({ "id": dragged.0, "moved": moved }));
    }
    if !moved {
        println!("dropped on its own list, nothing moved");
    }
    Ok(())
}

/// Where `tn` keeps its files, for display
fn describe_dir(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
