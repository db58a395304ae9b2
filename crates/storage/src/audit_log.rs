//! JSON-lines audit log.
//!
//! Two files per server run, both opened in append mode and never rewritten:
//!
//! - `auction_house_log_<N>.jsonln`: one [`RoundState`] per line
//! - `auction_house_log_player_id_<N>.jsonln`: one [`AgentIdentity`] per line
//!
//! `<N>` is the first index whose round log does not exist yet, so every run
//! gets a fresh pair and earlier runs are left untouched.
//!
//! # Threading
//!
//! ```text
//! record_*() ──encode──▶ channel ──▶ audit-log thread ──BufWriter──▶ files
//! ```
//!
//! Callers only encode and enqueue. The writer thread owns both files and
//! flushes whenever its queue runs dry, so the house never waits on disk.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use engine::AuditSink;
use serde::Serialize;
use tracing::warn;
use types::{AgentIdentity, RoundState};

use crate::error::{AuditError, Result};

const ROUND_LOG_PREFIX: &str = "auction_house_log_";
const IDENTITY_LOG_PREFIX: &str = "auction_house_log_player_id_";
const LOG_EXTENSION: &str = "jsonln";

/// Round log path for run index `n`.
pub fn round_log_path(dir: &Path, n: u32) -> PathBuf {
    dir.join(format!("{ROUND_LOG_PREFIX}{n}.{LOG_EXTENSION}"))
}

/// Identity log path for run index `n`.
pub fn identity_log_path(dir: &Path, n: u32) -> PathBuf {
    dir.join(format!("{IDENTITY_LOG_PREFIX}{n}.{LOG_EXTENSION}"))
}

/// Work for the writer thread.
#[derive(Debug)]
enum WriterCommand {
    Round(Vec<u8>),
    Identity(Vec<u8>),
    /// Flush both files, then acknowledge.
    Sync(Sender<()>),
}

/// Append-only audit log backed by two JSON-lines files.
#[derive(Debug)]
pub struct JsonlAuditLog {
    round_path: PathBuf,
    identity_path: PathBuf,
    tx: Option<Sender<WriterCommand>>,
    writer: Option<JoinHandle<()>>,
}

impl JsonlAuditLog {
    /// Open the log pair for run index `n` in `dir`, appending if present.
    pub fn open(dir: impl AsRef<Path>, n: u32) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let round_path = round_log_path(dir, n);
        let identity_path = identity_log_path(dir, n);
        let files = LogFiles {
            rounds: BufWriter::new(open_append(&round_path)?),
            identities: BufWriter::new(open_append(&identity_path)?),
            round_path: round_path.clone(),
            identity_path: identity_path.clone(),
        };

        let (tx, rx) = unbounded();
        let writer = thread::Builder::new()
            .name("audit-log".into())
            .spawn(move || files.run(rx))?;

        Ok(Self {
            round_path,
            identity_path,
            tx: Some(tx),
            writer: Some(writer),
        })
    }

    /// Open the first unused log pair in `dir`.
    pub fn open_next(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let n = (1..=u32::MAX)
            .find(|&n| !round_log_path(dir, n).exists())
            .ok_or(AuditError::Exhausted)?;
        Self::open(dir, n)
    }

    pub fn round_path(&self) -> &Path {
        &self.round_path
    }

    pub fn identity_path(&self) -> &Path {
        &self.identity_path
    }

    /// Block until every record queued so far is on disk.
    pub fn sync(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        self.send(WriterCommand::Sync(ack_tx))?;
        ack_rx.recv().map_err(|_| AuditError::WriterGone)
    }

    fn send(&self, command: WriterCommand) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or(AuditError::WriterGone)?
            .send(command)
            .map_err(|_| AuditError::WriterGone)
    }

    /// Encode one record as a single line.
    fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        Ok(line)
    }
}

impl Drop for JsonlAuditLog {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain, flush, and exit
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!(path = %self.round_path.display(), "audit writer panicked");
            }
        }
    }
}

impl AuditSink for JsonlAuditLog {
    fn name(&self) -> &str {
        "JsonlAuditLog"
    }

    fn record_agent(&self, identity: &AgentIdentity) {
        let sent = Self::encode(identity)
            .and_then(|line| self.send(WriterCommand::Identity(line)));
        if let Err(e) = sent {
            warn!(path = %self.identity_path.display(), error = %e, "failed to log agent");
        }
    }

    fn record_round(&self, round: &RoundState) {
        let sent = Self::encode(round).and_then(|line| self.send(WriterCommand::Round(line)));
        if let Err(e) = sent {
            warn!(
                path = %self.round_path.display(),
                round = round.round,
                error = %e,
                "failed to log round"
            );
        }
    }
}

/// The writer thread's side: both files, buffered.
struct LogFiles {
    round_path: PathBuf,
    identity_path: PathBuf,
    rounds: BufWriter<File>,
    identities: BufWriter<File>,
}

impl LogFiles {
    fn run(mut self, rx: Receiver<WriterCommand>) {
        while let Ok(command) = rx.recv() {
            match command {
                WriterCommand::Round(line) => {
                    if let Err(e) = self.rounds.write_all(&line) {
                        warn!(path = %self.round_path.display(), error = %e, "audit write failed");
                    }
                }
                WriterCommand::Identity(line) => {
                    if let Err(e) = self.identities.write_all(&line) {
                        warn!(
                            path = %self.identity_path.display(),
                            error = %e,
                            "audit write failed"
                        );
                    }
                }
                WriterCommand::Sync(ack) => {
                    self.flush();
                    let _ = ack.send(());
                }
            }

            if rx.is_empty() {
                self.flush();
            }
        }
        self.flush();
    }

    fn flush(&mut self) {
        if let Err(e) = self.rounds.flush() {
            warn!(path = %self.round_path.display(), error = %e, "audit flush failed");
        }
        if let Err(e) = self.identities.flush() {
            warn!(path = %self.identity_path.display(), error = %e, "audit flush failed");
        }
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AuditError::Open {
            path: path.to_path_buf(),
            source,
        })
}
