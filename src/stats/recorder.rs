use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread::{self, JoinHandle};

use super::IterationSnapshot;
use crate::error::{MdpError, Result};

/// Background writer for iteration snapshots.
///
/// Snapshots are handed over through a bounded channel; when it is full,
/// [`record`](Self::record) blocks until the writer catches up.
pub struct IterationRecorder {
    path: PathBuf,
    dims: usize,
    sender: Option<SyncSender<IterationSnapshot>>,
    handle: Option<JoinHandle<Result<usize>>>,
}

impl IterationRecorder {
    /// Truncate `path` and start the writer thread.
    pub fn start<P: AsRef<Path>>(path: P, dims: usize, capacity: usize) -> Result<Self> {
        if dims == 0 {
            return Err(MdpError::invalid_parameter("dims", "need at least one row per snapshot"));
        }
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let (sender, receiver) = sync_channel::<IterationSnapshot>(capacity.max(1));

        let handle = thread::Builder::new()
            .name("iteration-recorder".to_string())
            .spawn(move || -> Result<usize> {
                let mut writer = BufWriter::new(file);
                let mut written = 0;
                for snapshot in receiver {
                    write_snapshot(&mut writer, &snapshot)?;
                    written += 1;
                }
                writer.flush()?;
                Ok(written)
            })?;

        debug!("recording iterations to {}", path.display());
        Ok(IterationRecorder {
            path,
            dims,
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a snapshot for writing.
    pub fn record(&self, snapshot: IterationSnapshot) -> Result<()> {
        if snapshot.values.len() != self.dims {
            return Err(MdpError::dimension_mismatch(
                format!("{} value rows", self.dims),
                format!("{} value rows", snapshot.values.len()),
            ));
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| MdpError::RecorderClosed("recorder already finished".to_string()))?;
        sender
            .send(snapshot)
            .map_err(|_| MdpError::RecorderClosed("writer thread stopped".to_string()))
    }

    /// Close the channel, wait for every queued snapshot to be written and
    /// return how many were.
    pub fn finish(mut self) -> Result<usize> {
        let written = self.shutdown()?;
        info!("wrote {} snapshots to {}", written, self.path.display());
        Ok(written)
    }

    fn shutdown(&mut self) -> Result<usize> {
        self.sender.take();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| MdpError::RecorderClosed("writer thread panicked".to_string()))?,
            None => Ok(0),
        }
    }
}

impl Drop for IterationRecorder {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn write_snapshot<W: Write>(writer: &mut W, snapshot: &IterationSnapshot) -> Result<()> {
    writeln!(
        writer,
        "{} {} {}",
        snapshot.number, snapshot.elapsed, snapshot.summary
    )?;
    for row in &snapshot.values {
        let line = row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_record_checks_dims() {
        let dir = tempdir().unwrap();
        let recorder = IterationRecorder::start(dir.path().join("log.txt"), 2, 4).unwrap();
        let result = recorder.record(IterationSnapshot::single(0, 0.0, 0.0, vec![1.0]));
        assert!(matches!(result, Err(MdpError::DimensionMismatch { .. })));
        assert_eq!(recorder.finish().unwrap(), 0);
    }

    #[test]
    fn test_finish_drains_queue() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let recorder = IterationRecorder::start(&path, 1, 1).unwrap();
        for i in 0..50 {
            recorder
                .record(IterationSnapshot::single(i, 0.5, 1.0, vec![i as f64, f64::NAN]))
                .unwrap();
        }
        assert_eq!(recorder.finish().unwrap(), 50);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 100);
        assert!(text.starts_with("0 0.5 1\n0 NaN\n"));
    }
}
