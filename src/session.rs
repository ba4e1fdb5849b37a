//! Interactive session: read a line, dispatch or recall, offer to learn it.
//!
//! Each turn re-reads the whole store into a [`Snapshot`] before dispatching,
//! so commands and recall always see what is on disk right now.

use crate::command::{CommandError, Context, Flow, Registry};
use crate::ingest::Ingestor;
use crate::settings::Settings;
use crate::store::{MemoryStore, Snapshot};
use crate::words;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::io::{self, Write};

pub const PROMPT: &str = "You> ";
pub const LEARN_PROMPT: &str = "Learn from this? (y/N): ";

const GENERIC_PROMPTS: [&str; 4] = [
    "If we probe deeper, consider: '{}…'",
    "This might hint at: '{}…'",
    "Imagine if: '{}…'",
    "Under the surface, '{}' reveals layers.",
];

const ELABORATIONS: [&str; 4] = [
    "Consider deeper: '{}…'",
    "Could imply: '{}…'",
    "Stretching: '{}…'",
    "Under the surface, '{}'…",
];

/// One line of input, or why there wasn't one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupted,
    Eof,
}

/// Where the session reads lines from (a terminal editor, a script in tests).
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Input>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingCommand,
    Dispatching,
    AwaitingLearnPrompt,
    Terminated,
}

/// A memory fragment that matched a recall query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recollection {
    pub kind: &'static str,
    pub topic: String,
    pub thought: String,
}

/// Case-insensitive substring search over summary points, reflection
/// questions, and tree nodes (parent keys and their direct children).
pub fn recall(snapshot: &Snapshot, query: &str) -> Vec<Recollection> {
    let q = query.to_lowercase();
    let hit = |text: &str| text.to_lowercase().contains(&q);
    let mut out = Vec::new();

    let mut push = |kind: &'static str, topic: &str, thought: &str| {
        out.push(Recollection {
            kind,
            topic: topic.to_string(),
            thought: thought.to_string(),
        })
    };

    for (topic, points) in &snapshot.summaries {
        for point in points.iter().filter(|p| hit(p)) {
            push("summary", topic, point);
        }
    }
    for (topic, questions) in &snapshot.reflections {
        for question in questions.iter().filter(|q| hit(q)) {
            push("reflection", topic, question);
        }
    }
    for (topic, tree) in &snapshot.trees {
        for (parent, kids) in tree {
            if hit(parent) {
                push("tree", topic, parent);
            }
            for kid in kids.iter().filter(|k| hit(k)) {
                push("tree", topic, kid);
            }
        }
    }
    out
}

fn fill(template: &str, text: &str) -> String {
    template.replacen("{}", text, 1)
}

pub struct CommandSession<W: Write> {
    store: MemoryStore,
    registry: Registry,
    settings: Settings,
    snapshot: Snapshot,
    state: SessionState,
    rng: StdRng,
    out: W,
}

impl<W: Write> CommandSession<W> {
    /// Aliases from `settings` are added to `registry`.
    pub fn new(store: MemoryStore, mut registry: Registry, settings: Settings, out: W) -> Self {
        for (alias, name) in &settings.aliases {
            registry.alias(alias, name);
        }
        Self {
            store,
            registry,
            settings,
            snapshot: Snapshot::default(),
            state: SessionState::Idle,
            rng: StdRng::from_entropy(),
            out,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Read and run turns until `exit` (or end of input).
    pub fn run(&mut self, input: &mut dyn LineSource) -> io::Result<()> {
        writeln!(self.out, "Memory chat (type 'help')")?;
        self.state = SessionState::AwaitingCommand;

        while self.state != SessionState::Terminated {
            match input.read_line(PROMPT)? {
                Input::Line(line) => self.turn(&line, input)?,
                Input::Interrupted => writeln!(self.out, "(use 'exit' to quit)")?,
                Input::Eof => {
                    writeln!(self.out, "Goodbye.")?;
                    self.state = SessionState::Terminated;
                }
            }
        }
        self.out.flush()
    }

    /// One full turn for `line`, including the learn prompt.
    pub fn turn(&mut self, line: &str, input: &mut dyn LineSource) -> io::Result<()> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        self.refresh();
        self.state = SessionState::Dispatching;

        let tokens = match words::split(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                writeln!(self.out, "error: {e}")?;
                self.state = SessionState::AwaitingCommand;
                return Ok(());
            }
        };

        let key = tokens.first().map(|t| t.to_lowercase()).unwrap_or_default();
        if self.registry.resolve(&key).is_some() {
            match self.execute(&key, &tokens[1..]) {
                Ok(Flow::Exit) => {
                    self.state = SessionState::Terminated;
                    return Ok(());
                }
                Ok(Flow::Continue) => {}
                Err(e) => {
                    log::debug!("[session] '{key}' failed: {e:?}");
                    writeln!(self.out, "error: {e}")?;
                }
            }
        } else {
            self.respond(line)?;
        }

        self.state = SessionState::AwaitingLearnPrompt;
        let answer = match input.read_line(LEARN_PROMPT)? {
            Input::Line(answer) => answer,
            Input::Interrupted | Input::Eof => String::new(),
        };
        if answer.trim().to_lowercase().starts_with('y') {
            self.learn(line)?;
        }
        self.state = SessionState::AwaitingCommand;
        Ok(())
    }

    /// Run the command `token` resolves to. Handler failures come back as errors.
    pub fn execute(&mut self, token: &str, args: &[String]) -> Result<Flow, CommandError> {
        let command = self
            .registry
            .resolve(token)
            .ok_or_else(|| CommandError::Failed(format!("unknown command '{token}'")))?;
        let mut ctx = Context {
            store: &self.store,
            snapshot: &self.snapshot,
            settings: &self.settings,
            registry: &self.registry,
            out: &mut self.out,
        };
        command.invoke(&mut ctx, args)
    }

    /// Re-read the store. On failure the previous snapshot is kept.
    pub fn refresh(&mut self) {
        match self.store.snapshot() {
            Ok(snapshot) => self.snapshot = snapshot,
            Err(e) => log::warn!("[session] memory refresh failed: {e}"),
        }
    }

    fn respond(&mut self, line: &str) -> io::Result<()> {
        let matches = recall(&self.snapshot, line);
        match matches.choose(&mut self.rng) {
            None => {
                let template = GENERIC_PROMPTS
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(GENERIC_PROMPTS[0]);
                writeln!(self.out, "\nSymbiont> {}\n", fill(template, line))
            }
            Some(m) => {
                writeln!(
                    self.out,
                    "\nSymbiont> Reflecting on '{}' ({}):\n  \"{}\"",
                    m.topic, m.kind, m.thought
                )?;
                let template = ELABORATIONS
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(ELABORATIONS[0]);
                writeln!(self.out, "Symbiont> {}\n", fill(template, &m.thought))
            }
        }
    }

    fn learn(&mut self, line: &str) -> io::Result<()> {
        let ingestor = Ingestor::new(&self.store).with_layers(self.settings.tree_default);
        match ingestor.learn_chat(line) {
            Ok(done) => writeln!(self.out, "\nLearned & stored new chat memory: {}\n", done.topic),
            Err(e) => writeln!(self.out, "error: could not store memory: {e}"),
        }
    }
}
