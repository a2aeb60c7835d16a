use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::str::FromStr;

use super::IterationSnapshot;
use crate::error::{MdpError, Result};

/// Reader for files written by [`super::IterationRecorder`].
pub struct IterationLog;

impl IterationLog {
    /// Read every snapshot of a log with `dims` value rows per snapshot.
    pub fn load<P: AsRef<Path>>(path: P, dims: usize) -> Result<Vec<IterationSnapshot>> {
        let mut snapshots = Vec::new();
        Self::replay(path, dims, |snapshot| snapshots.push(snapshot.clone()))?;
        Ok(snapshots)
    }

    /// Stream snapshots to `on_iteration` in file order without holding the
    /// whole log in memory. Returns the number of snapshots replayed.
    pub fn replay<P, F>(path: P, dims: usize, mut on_iteration: F) -> Result<usize>
    where
        P: AsRef<Path>,
        F: FnMut(&IterationSnapshot),
    {
        let mut reader = SnapshotReader {
            lines: BufReader::new(File::open(path)?).lines(),
            line_no: 0,
            dims,
        };
        let mut count = 0;
        while let Some(snapshot) = reader.next_snapshot()? {
            on_iteration(&snapshot);
            count += 1;
        }
        Ok(count)
    }
}

struct SnapshotReader {
    lines: Lines<BufReader<File>>,
    line_no: usize,
    dims: usize,
}

impl SnapshotReader {
    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn next_snapshot(&mut self) -> Result<Option<IterationSnapshot>> {
        let header = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(self.error(format!(
                "expected 'number elapsed summary', found '{}'",
                header
            )));
        }
        let number = self.parse::<usize>(fields[0])?;
        let elapsed = self.parse::<f64>(fields[1])?;
        let summary = self.parse::<f64>(fields[2])?;

        let mut values = Vec::with_capacity(self.dims);
        for _ in 0..self.dims {
            let line = self
                .next_line()?
                .ok_or_else(|| self.error("log ends inside a snapshot".to_string()))?;
            let row = line
                .split_whitespace()
                .map(|token| self.parse::<f64>(token))
                .collect::<Result<Vec<f64>>>()?;
            values.push(row);
        }
        Ok(Some(IterationSnapshot::new(number, elapsed, summary, values)))
    }

    fn parse<T: FromStr>(&self, token: &str) -> Result<T> {
        token
            .parse::<T>()
            .map_err(|_| self.error(format!("cannot parse '{}'", token)))
    }

    fn error(&self, reason: String) -> MdpError {
        MdpError::Serialization(format!("iteration log line {}: {}", self.line_no, reason))
    }
}
