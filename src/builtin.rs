//! Built-in REPL commands.

use crate::command::{Command, CommandError, Context, Flow, Registry};
use crate::simulate::{self, SimulationEngine};
use crate::store::RecordKind;
use crate::tree;
use std::io::Write;

pub fn register_builtins(r: &mut Registry) {
    r.register(Box::new(Search));
    r.register(Box::new(Tree));
    r.register(Box::new(Simulate));
    r.register(Box::new(Help));
    r.register(Box::new(Exit));
}

/// Trailing all-digit token is a layer count; the rest is joined as text.
pub fn depth_and_text(tokens: &[String], default_depth: usize) -> (String, usize) {
    if let Some((last, rest)) = tokens.split_last() {
        if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(depth) = last.parse() {
                return (rest.join(" ").trim().to_string(), depth);
            }
        }
    }
    (tokens.join(" ").trim().to_string(), default_depth)
}

pub struct Search;

impl Command for Search {
    fn name(&self) -> &'static str {
        "search"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["s", "se"]
    }

    fn about(&self) -> &'static str {
        "list memories carrying a tag"
    }

    fn invoke(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow, CommandError> {
        let Some(tag) = args.first() else {
            return Err(CommandError::Usage("search <tag>"));
        };
        let tag = tag.to_lowercase();
        let found = ctx.store.search_memories(&tag)?;
        if found.is_empty() {
            writeln!(ctx.out, "No memories tagged '{tag}'.")?;
            return Ok(Flow::Continue);
        }

        writeln!(ctx.out, "Memories tagged '{tag}':")?;
        for (topic, record) in &found.summaries {
            for (i, point) in record.body.iter().enumerate() {
                writeln!(ctx.out, "  [S] {topic} {}. {point}", i + 1)?;
            }
        }
        for (topic, record) in &found.reflections {
            for (i, question) in record.body.iter().enumerate() {
                writeln!(ctx.out, "  [R] {topic} {}. {question}", i + 1)?;
            }
        }
        Ok(Flow::Continue)
    }
}

pub struct Tree;

impl Command for Tree {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["t", "tr"]
    }

    fn about(&self) -> &'static str {
        "grow reflection trees for a tag"
    }

    fn invoke(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow, CommandError> {
        let (tag, layers) = depth_and_text(args, ctx.settings.tree_default);
        if tag.is_empty() {
            return Err(CommandError::Usage("tree <tag> [layers]"));
        }
        let hits = ctx.store.search_by_tag(RecordKind::Reflection, &tag)?;
        if hits.is_empty() {
            writeln!(ctx.out, "No reflections for tag '{tag}'.")?;
            return Ok(Flow::Continue);
        }

        writeln!(ctx.out, "Reflection trees for '{tag}' ({layers} layers):")?;
        for (topic, record) in &hits {
            writeln!(ctx.out, "\n  Topic: {topic}")?;
            let grown = tree::grow(&record.body, layers);
            for line in tree::render(&grown, &record.body, layers) {
                writeln!(ctx.out, "{line}")?;
            }
        }
        Ok(Flow::Continue)
    }
}

pub struct Simulate;

impl Command for Simulate {
    fn name(&self) -> &'static str {
        "simulate"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["sim"]
    }

    fn about(&self) -> &'static str {
        "project a scenario forward (--tag <tag> to draw on stored reflections)"
    }

    fn invoke(&self, ctx: &mut Context<'_>, args: &[String]) -> Result<Flow, CommandError> {
        const USAGE: &str = "simulate <text> [layers] [--tag <tag>]";

        let mut rest = Vec::with_capacity(args.len());
        let mut tag = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--tag" {
                tag = Some(iter.next().ok_or(CommandError::Usage(USAGE))?.as_str());
            } else {
                rest.push(arg.clone());
            }
        }

        let (text, depth) = depth_and_text(&rest, ctx.settings.sim_default);
        if text.is_empty() {
            return Err(CommandError::Usage(USAGE));
        }

        let sim = SimulationEngine::new(ctx.store).simulate(&text, depth, tag)?;
        writeln!(ctx.out, "Simulation from '{text}' ({depth} layers):")?;
        for line in simulate::render(&sim) {
            writeln!(ctx.out, "{line}")?;
        }
        Ok(Flow::Continue)
    }
}

pub struct Help;

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["h", "?"]
    }

    fn about(&self) -> &'static str {
        "show this list"
    }

    fn invoke(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow, CommandError> {
        writeln!(ctx.out, "Commands:")?;
        for command in ctx.registry.commands() {
            let aliases = ctx.registry.aliases_of(command.name());
            let mut line = format!("  {}", command.name());
            if !aliases.is_empty() {
                line.push_str(&format!(" ({})", aliases.join(", ")));
            }
            if !command.about().is_empty() {
                line.push_str(&format!(" - {}", command.about()));
            }
            writeln!(ctx.out, "{line}")?;
        }
        Ok(Flow::Continue)
    }
}

pub struct Exit;

impl Command for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["q", "quit"]
    }

    fn about(&self) -> &'static str {
        "leave the session"
    }

    fn invoke(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow, CommandError> {
        writeln!(ctx.out, "Goodbye.")?;
        ctx.out.flush()?;
        Ok(Flow::Exit)
    }
}
