use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing_subscriber::EnvFilter;

use context_tree::app::{
    self, commands, events::UserEvent, state::AppState, tasks::OutputTarget, view_model,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Select project files, exclude paths for good, and aggregate contents into one text file",
    long_about = None
)]
struct Cli {
    /// Root directory to open (default: the configured default root).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the tree, optionally with a selection and a highlighted search hit.
    Tree {
        #[command(flatten)]
        selection: SelectionOpts,

        /// Search for a file and reveal the best hit in the tree.
        #[arg(long, value_name = "QUERY")]
        find: Option<String>,
    },
    /// Search file and folder names below the root.
    Search {
        query: String,

        /// Maximum number of results (1-50).
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
    /// Concatenate the selected files into the output file.
    Generate {
        #[command(flatten)]
        selection: SelectionOpts,

        /// Print the content instead of writing the output file.
        #[arg(long)]
        stdout: bool,

        /// Also print a truncated preview of the written content.
        #[arg(long, conflicts_with = "stdout")]
        preview: bool,
    },
    /// Print a shell script that reproduces the generation.
    Bash {
        #[command(flatten)]
        selection: SelectionOpts,
    },
    /// Manage the persistent exclusion list.
    #[command(subcommand)]
    Exclude(ExcludeCommand),
    /// Show or change the configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone, Default)]
struct SelectionOpts {
    /// File or folder to select; relative paths resolve against the root.
    #[arg(long = "select", value_name = "PATH")]
    paths: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ExcludeCommand {
    /// Exclude a file or folder.
    Add { path: PathBuf },
    /// Remove entries from the exclusion list.
    Remove {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Empty the exclusion list.
    Clear,
    /// Print the exclusion list.
    List,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Open this directory when no --root is given.
    SetRoot { dir: PathBuf },
    UnsetRoot,
}

/// Drives the app layer the way an interactive front end would: commands run
/// against the state, worker results come back over the channel.
struct Session {
    state: AppState,
    proxy: UnboundedSender<UserEvent>,
    events: UnboundedReceiver<UserEvent>,
}

impl Session {
    fn new(state: AppState) -> Self {
        let (proxy, events) = mpsc::unbounded_channel();
        Self {
            state,
            proxy,
            events,
        }
    }

    /// Applies queued events, then waits until no background work is pending.
    async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.events.try_recv() {
                self.apply(event);
            }
            if !self.state.is_indexing() && !self.state.is_generating {
                return;
            }
            match self.events.recv().await {
                Some(event) => self.apply(event),
                None => return,
            }
        }
    }

    fn apply(&mut self, event: UserEvent) {
        match app::handle_user_event(&mut self.state, &self.proxy, event) {
            Some(UserEvent::ShowError(message)) => eprintln!("error: {message}"),
            Some(UserEvent::ShowWarning(message)) => eprintln!("warning: {message}"),
            Some(UserEvent::GenerationProgress(progress)) => tracing::debug!(
                "[{}/{}] {}",
                progress.processed,
                progress.total,
                progress.current_file.display()
            ),
            _ => {}
        }
    }

    async fn open(&mut self, requested: Option<&Path>) -> Result<()> {
        let root = match requested {
            Some(root) => root.to_path_buf(),
            None => self
                .state
                .config
                .valid_default_root()
                .map(Path::to_path_buf)
                .context("No root directory: pass --root or run `config set-root DIR`")?,
        };
        commands::load_root(&mut self.state, &self.proxy, &root);
        self.settle().await;
        if self.state.root().is_none() {
            bail!("Root path does not exist: {}", root.display());
        }
        Ok(())
    }

    async fn select(&mut self, selection: &SelectionOpts) {
        for path in &selection.paths {
            let path = self.resolve(path);
            commands::toggle_path(&mut self.state, &self.proxy, &path, Some(true));
        }
        self.settle().await;
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        let candidate = match self.state.root() {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        };
        fs::canonicalize(&candidate).unwrap_or(candidate)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state = AppState::load(None);
    let mut session = Session::new(state);

    match cli.command {
        Command::Tree { selection, find } => {
            session.open(cli.root.as_deref()).await?;
            session.select(&selection).await;
            if let Some(query) = find {
                commands::update_search(&mut session.state, &session.proxy, &query);
                commands::go_to_result(&mut session.state, &session.proxy, 0);
                session.settle().await;
            }
            let rows = view_model::visible_rows(&session.state.tree);
            print!("{}", view_model::render_rows(&rows));
            eprintln!(
                "{}  |  {}",
                view_model::selection_label(session.state.tree.get_selected().len()),
                session.state.status_message
            );
        }
        Command::Search { query, limit } => {
            if let Some(limit) = limit {
                session.state.config.search_result_limit = limit;
            }
            session.open(cli.root.as_deref()).await?;
            commands::update_search(&mut session.state, &session.proxy, &query);
            session.settle().await;
            for entry in &session.state.search_results {
                let kind = if entry.is_directory { "[+]" } else { "   " };
                println!("{} {}  {}", kind, entry.name, entry.path.display());
            }
            eprintln!("{}", session.state.status_message);
        }
        Command::Generate {
            selection,
            stdout,
            preview,
        } => {
            session.open(cli.root.as_deref()).await?;
            session.select(&selection).await;
            let target = if stdout {
                OutputTarget::Memory
            } else {
                OutputTarget::File
            };
            let Some(handle) =
                commands::generate_content(&mut session.state, &session.proxy, target)
            else {
                session.settle().await;
                bail!("Nothing to generate");
            };
            handle.await?;
            session.settle().await;

            let Some(generated) = session.state.last_generated.as_ref() else {
                bail!("{}", session.state.status_message);
            };
            if stdout {
                print!("{}", generated.content);
            } else {
                if preview {
                    println!("{}", generated.preview());
                }
                println!("{}", session.state.status_message);
            }
            eprintln!("{}", generated.stats.summary());
        }
        Command::Bash { selection } => {
            session.open(cli.root.as_deref()).await?;
            session.select(&selection).await;
            let script = commands::shell_command(&mut session.state, &session.proxy);
            session.settle().await;
            match script {
                Some(script) => println!("{script}"),
                None => bail!("Nothing to describe"),
            }
        }
        Command::Exclude(command) => {
            match command {
                ExcludeCommand::Add { path } => {
                    let path = fs::canonicalize(&path)
                        .with_context(|| format!("Cannot exclude {}", path.display()))?;
                    commands::exclude_path(&mut session.state, &session.proxy, &path);
                }
                ExcludeCommand::Remove { paths } => {
                    let entries: Vec<String> = paths
                        .iter()
                        .map(|p| {
                            fs::canonicalize(p)
                                .unwrap_or_else(|_| p.clone())
                                .to_string_lossy()
                                .into_owned()
                        })
                        .collect();
                    commands::remove_exclusions(&mut session.state, &session.proxy, &entries);
                }
                ExcludeCommand::Clear => {
                    commands::clear_exclusions(&mut session.state, &session.proxy);
                }
                ExcludeCommand::List => {
                    for entry in session.state.exclusions.snapshot().iter() {
                        println!("{entry}");
                    }
                }
            }
            session.settle().await;
            eprintln!("Exclusion list: {} entries", session.state.exclusions.len());
        }
        Command::Config(command) => {
            match command {
                ConfigCommand::Show => {
                    println!("{}", serde_json::to_string_pretty(&session.state.config)?);
                }
                ConfigCommand::SetRoot { dir } => {
                    commands::set_default_root(&mut session.state, &session.proxy, Some(dir), None);
                    eprintln!("{}", session.state.status_message);
                }
                ConfigCommand::UnsetRoot => {
                    commands::set_default_root(&mut session.state, &session.proxy, None, None);
                    eprintln!("{}", session.state.status_message);
                }
            }
            session.settle().await;
        }
    }

    Ok(())
}
