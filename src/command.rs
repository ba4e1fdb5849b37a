//! Command registry: name + aliases → handler.
//!
//! The session knows nothing about what a command does. Anything that
//! implements [`Command`] (or wraps a closure in [`FnCommand`]) can be
//! registered before the session starts and shows up in `help`.

use crate::settings::Settings;
use crate::store::{MemoryStore, Snapshot, StoreError};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("output: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Failed(String),
}

/// What the session does after a command returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Everything a handler may touch during one invocation.
pub struct Context<'a> {
    pub store: &'a MemoryStore,
    pub snapshot: &'a Snapshot,
    pub settings: &'a Settings,
    pub registry: &'a Registry,
    pub out: &'a mut dyn Write,
}

pub trait Command {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// One-line description for `help`.
    fn about(&self) -> &'static str {
        ""
    }

    fn invoke(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow, CommandError>;
}

/// Closure-backed command for collaborators that only need their arguments
/// and somewhere to print.
pub struct FnCommand<F> {
    name: &'static str,
    aliases: &'static [&'static str],
    about: &'static str,
    handler: F,
}

impl<F> FnCommand<F>
where
    F: Fn(&[String], &mut dyn Write) -> Result<(), CommandError>,
{
    pub fn new(name: &'static str, aliases: &'static [&'static str], handler: F) -> Self {
        Self {
            name,
            aliases,
            about: "",
            handler,
        }
    }

    pub fn about(mut self, about: &'static str) -> Self {
        self.about = about;
        self
    }
}

impl<F> Command for FnCommand<F>
where
    F: Fn(&[String], &mut dyn Write) -> Result<(), CommandError>,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    fn about(&self) -> &'static str {
        self.about
    }

    fn invoke(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow, CommandError> {
        (self.handler)(args, &mut *ctx.out)?;
        Ok(Flow::Continue)
    }
}

/// Registered commands plus the alias table. Canonical names alias themselves.
/// Names and aliases are stored lower-cased, matching how input is looked up.
#[derive(Default)]
pub struct Registry {
    commands: BTreeMap<String, Box<dyn Command>>,
    aliases: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `search`, `tree`, `simulate`, `help`, `exit`.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        crate::builtin::register_builtins(&mut r);
        r
    }

    /// Add `command`, replacing any earlier one with the same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        let name = command.name().to_lowercase();
        if self.commands.contains_key(&name) {
            log::debug!("[registry] replacing command '{name}'");
        }
        self.aliases.insert(name.clone(), name.clone());
        for alias in command.aliases() {
            self.aliases.insert(alias.to_lowercase(), name.clone());
        }
        self.commands.insert(name, command);
    }

    /// Point `alias` at `name`. Resolution still requires `name` to exist.
    pub fn alias(&mut self, alias: &str, name: &str) {
        self.aliases.insert(alias.to_lowercase(), name.to_lowercase());
    }

    /// Canonical (lower-cased) name for `token`, if it resolves to a
    /// registered command.
    pub fn canonical(&self, token: &str) -> Option<&str> {
        let name = self.aliases.get(token)?;
        self.commands
            .get_key_value(name.as_str())
            .map(|(key, _)| key.as_str())
    }

    pub fn resolve(&self, token: &str) -> Option<&dyn Command> {
        let name = self.canonical(token)?;
        self.commands.get(name).map(|c| c.as_ref())
    }

    /// Commands in name order.
    pub fn commands(&self) -> impl Iterator<Item = &(dyn Command + 'static)> {
        self.commands.values().map(|c| c.as_ref())
    }

    /// Aliases of `name`, sorted, without `name` itself.
    pub fn aliases_of(&self, name: &str) -> Vec<&str> {
        let name = name.to_lowercase();
        let mut out: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(alias, target)| target.as_str() == name && alias.as_str() != name)
            .map(|(alias, _)| alias.as_str())
            .collect();
        out.sort();
        out
    }
}
