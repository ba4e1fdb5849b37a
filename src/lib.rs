//! vire: a personal memory assistant.
//!
//! Text goes in through the ingestion pipeline (digest → reflect → tree) and
//! lands in a [`store::MemoryStore`] as tagged JSON records. The interactive
//! [`session::CommandSession`] searches, replays and extends that memory.

pub mod builtin;
pub mod command;
pub mod digest;
pub mod ingest;
pub mod metrics;
pub mod reflect;
pub mod session;
pub mod settings;
pub mod simulate;
pub mod store;
pub mod tree;
pub mod words;

pub use command::{Command, CommandError, Context, FnCommand, Flow, Registry};
pub use session::{CommandSession, Input, LineSource, SessionState};
pub use store::{MemoryStore, Record, RecordKind, Snapshot, StoreError};
