use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use std::path::PathBuf;
use vire::ingest::Ingestor;
use vire::metrics::Metrics;
use vire::settings::Settings;
use vire::{CommandSession, Flow, Input, LineSource, MemoryStore, Registry};

#[derive(Parser)]
#[command(name = "vire", about = "vire: personal memory assistant")]
struct Cli {
    /// Memory root holding summaries/, reflections/, trees/ and settings.json
    #[arg(long, env = "VIRE_MEMORY_DIR")]
    memory_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Interactive chat over your memories (default)
    Chat,
    /// Digest every *.txt in a folder into memory
    Ingest {
        /// Input folder (defaults to <memory-dir>/inputs)
        dir: Option<PathBuf>,
    },
    /// List memories carrying a tag
    Search {
        tag: String,
    },
    /// Project a scenario forward through hypothetical next states
    Simulate {
        text: String,
        /// Layers to expand (defaults to sim_default from settings)
        #[arg(short = 'n', long)]
        depth: Option<usize>,
        /// Draw next states from the reflections stored under this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// Counts of stored memories and tag frequencies
    Metrics,
}

fn default_memory_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    home.join(".vire")
}

/// Terminal input with line editing and history.
struct Terminal {
    editor: DefaultEditor,
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> io::Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Eof),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e.to_string())),
        }
    }
}

fn registry() -> Registry {
    let mut r = Registry::with_builtins();
    r.register(Box::new(Metrics));
    r
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {msg}");
    std::process::exit(1);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let root = cli.memory_dir.unwrap_or_else(default_memory_dir);
    let store = MemoryStore::open(root).unwrap_or_else(|e| fail(e));
    let settings = Settings::load(store.root());

    match cli.cmd.unwrap_or(Cmd::Chat) {
        Cmd::Chat => {
            let editor = DefaultEditor::new().unwrap_or_else(|e| fail(e));
            let mut terminal = Terminal { editor };
            let mut session = CommandSession::new(store, registry(), settings, io::stdout());
            if let Err(e) = session.run(&mut terminal) {
                fail(e);
            }
            std::process::exit(0);
        }

        Cmd::Ingest { dir } => {
            let dir = dir.unwrap_or_else(|| store.root().join("inputs"));
            let ingestor = Ingestor::new(&store).with_layers(settings.tree_default);
            let report = ingestor.ingest_all(&dir).unwrap_or_else(|e| fail(e));
            if report.ingested.is_empty() && report.failed.is_empty() {
                eprintln!("no files to ingest in {}", dir.display());
            }
            for done in &report.ingested {
                println!(
                    "ingested {} [{}]: {} points, {} reflections, {} tree nodes",
                    done.topic,
                    done.tags.join(", "),
                    done.points.len(),
                    done.reflections.len(),
                    done.tree_nodes
                );
            }
            for (path, e) in &report.failed {
                eprintln!("skipped {}: {e}", path.display());
            }
        }

        Cmd::Search { tag } => one_shot(store, settings, "search", vec![tag]),

        Cmd::Simulate { text, depth, tag } => {
            let depth = depth.unwrap_or(settings.sim_default);
            let mut args = vec![text, depth.to_string()];
            if let Some(tag) = tag {
                args.push("--tag".into());
                args.push(tag);
            }
            one_shot(store, settings, "simulate", args)
        }

        Cmd::Metrics => one_shot(store, settings, "metrics", Vec::new()),
    }
}

/// Run a single REPL command outside the loop.
fn one_shot(store: MemoryStore, settings: Settings, name: &str, args: Vec<String>) {
    let mut session = CommandSession::new(store, registry(), settings, io::stdout());
    session.refresh();
    match session.execute(name, &args) {
        Ok(Flow::Continue | Flow::Exit) => {
            let _ = io::stdout().flush();
        }
        Err(e) => fail(e),
    }
}
