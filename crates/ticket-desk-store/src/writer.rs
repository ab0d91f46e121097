//! Implementation of the single writer that persists snapshots

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Sender};

enum WriterMsg {
    /// Serialized database document, newer than every snapshot sent before
    Snapshot(Vec<u8>),
    /// Acknowledge once every snapshot sent before has been written
    Flush(Sender<()>),
}

/// Background thread owning the database file
///
/// Snapshots are written strictly in the order they were enqueued, one write
/// at a time. When several snapshots are waiting, only the newest one is
/// written, so the file never falls back to an older state.
pub struct Writer {
    sender: Sender<WriterMsg>,
    thread: JoinHandle<()>,
}

impl Writer {
    /// Spawn the writer thread for the file at `path`
    pub fn spawn(path: PathBuf) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded();
        let thread = thread::Builder::new()
            .name(String::from("writer"))
            .spawn(move || run(&path, receiver))?;
        Ok(Self { sender, thread })
    }

    /// Enqueue a snapshot without waiting for it to be written
    pub fn persist(&self, snapshot: Vec<u8>) {
        if self.sender.send(WriterMsg::Snapshot(snapshot)).is_err() {
            tracing::warn!("writer is gone, dropping snapshot");
        }
    }

    /// Block until every snapshot enqueued so far is on disk (or failed)
    pub fn flush(&self) {
        let (ack_sender, ack_receiver) = unbounded();
        if self.sender.send(WriterMsg::Flush(ack_sender)).is_ok() {
            let _ = ack_receiver.recv();
        }
    }

    /// Write all pending snapshots and stop the thread
    pub fn shutdown(self) {
        drop(self.sender);
        if self.thread.join().is_err() {
            tracing::error!("writer thread panicked");
        }
    }
}

/// The writer's main routine
fn run(path: &Path, receiver: Receiver<WriterMsg>) {
    let mut acks = Vec::new();
    while let Ok(msg) = receiver.recv() {
        let mut latest = None;
        let mut skipped = 0usize;
        for msg in std::iter::once(msg).chain(receiver.try_iter()) {
            match msg {
                WriterMsg::Snapshot(snapshot) => {
                    if latest.replace(snapshot).is_some() {
                        skipped += 1;
                    }
                }
                WriterMsg::Flush(ack) => acks.push(ack),
            }
        }

        if let Some(snapshot) = latest {
            match write_file(path, &snapshot) {
                Ok(()) => tracing::debug!(
                    path = %path.display(),
                    bytes = snapshot.len(),
                    skipped,
                    "database written"
                ),
                Err(e) => tracing::warn!(path = %path.display(), "writing database failed: {e}"),
            }
        }

        for ack in acks.drain(..) {
            let _ = ack.send(());
        }
    }
    tracing::debug!("writer stopped");
}

/// Replace the file at `path` by writing a sibling file and renaming it
fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}
