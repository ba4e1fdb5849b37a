//! `metrics`: counts of stored memories and how often each tag is used.

use crate::command::{Command, CommandError, Context, Flow};
use crate::store::{MemoryStore, StoreError};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Default, PartialEq)]
pub struct MemoryMetrics {
    pub summaries: usize,
    pub reflections: usize,
    pub trees: usize,
    pub points: usize,
    pub questions: usize,
    pub tags: BTreeMap<String, usize>,
}

impl MemoryMetrics {
    pub fn collect(store: &MemoryStore) -> Result<Self, StoreError> {
        let summaries = store.load_all_summaries()?;
        let reflections = store.load_all_reflections()?;
        let trees = store.load_all_trees()?;

        let mut m = Self {
            summaries: summaries.len(),
            reflections: reflections.len(),
            trees: trees.len(),
            ..Self::default()
        };
        for record in summaries.values() {
            m.points += record.body.len();
        }
        for record in reflections.values() {
            m.questions += record.body.len();
        }
        for record in summaries.values().chain(reflections.values()) {
            for tag in &record.tags {
                *m.tags.entry(tag.clone()).or_default() += 1;
            }
        }
        Ok(m)
    }

    /// Tags by count descending, then name.
    pub fn top_tags(&self) -> Vec<(&str, usize)> {
        let mut tags: Vec<(&str, usize)> = self.tags.iter().map(|(t, n)| (t.as_str(), *n)).collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        tags
    }
}

pub struct Metrics;

impl Command for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["stats", "m"]
    }

    fn about(&self) -> &'static str {
        "memory counts and tag frequencies"
    }

    fn invoke(&self, ctx: &mut Context<'_>, _args: &[String]) -> Result<Flow, CommandError> {
        let m = MemoryMetrics::collect(ctx.store)?;
        writeln!(ctx.out, "Memory metrics:")?;
        writeln!(ctx.out, "  summaries:   {} ({} points)", m.summaries, m.points)?;
        writeln!(ctx.out, "  reflections: {} ({} questions)", m.reflections, m.questions)?;
        writeln!(ctx.out, "  trees:       {}", m.trees)?;
        if !m.tags.is_empty() {
            writeln!(ctx.out, "  tags:")?;
            for (tag, n) in m.top_tags() {
                writeln!(ctx.out, "    {tag}: {n}")?;
            }
        }
        Ok(Flow::Continue)
    }
}
