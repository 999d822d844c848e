//! Upload progress for request bodies.
//!
//! [`ProgressReader`] is what the transport reads the body from; it knows
//! nothing about percentages. [`Progress`] is the default observer that turns
//! `(total, chunk)` notifications into printed percentages.

use std::fmt;
use std::io::{self, Read};

/// Observer called with `(total length, bytes returned by this read)`.
pub type ProgressCallback = Box<dyn FnMut(u64, u64) + Send>;

/// A request body that reports every non-empty read to a callback.
pub struct ProgressReader {
    body: Vec<u8>,
    position: usize,
    callback: Option<ProgressCallback>,
}

impl ProgressReader {
    pub fn new(body: Vec<u8>) -> ProgressReader {
        ProgressReader { body, position: 0, callback: None }
    }

    pub fn with_callback<F>(body: Vec<u8>, callback: F) -> ProgressReader
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        ProgressReader { body, position: 0, callback: Some(Box::new(callback)) }
    }

    /// Length of the whole body, independent of how much was read.
    pub fn total_len(&self) -> u64 {
        self.body.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Returns the next slice of at most `max` bytes. Empty once exhausted.
    pub fn read_chunk(&mut self, max: usize) -> &[u8] {
        let start = self.position;
        let end = start + max.min(self.body.len() - start);
        self.position = end;

        if end > start {
            let total = self.total_len();
            if let Some(ref mut callback) = self.callback {
                callback(total, (end - start) as u64);
            }
        }
        &self.body[start..end]
    }
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_chunk(buf.len());
        let n = chunk.len();
        buf[..n].copy_from_slice(chunk);
        Ok(n)
    }
}

impl fmt::Debug for ProgressReader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ProgressReader")
            .field("total_len", &self.body.len())
            .field("position", &self.position)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Tracks bytes seen for one upload and prints a percentage line whenever it
/// strictly increases.
#[derive(Debug, Clone)]
pub struct Progress {
    name: String,
    seen: u64,
    last_pct: f64,
}

impl Progress {
    pub fn new<S: Into<String>>(name: S) -> Progress {
        Progress { name: name.into(), seen: 0, last_pct: 0.0 }
    }

    /// Records a chunk and returns the new percentage if it should be
    /// reported. Tiny chunks against a large total often leave the
    /// percentage unchanged; those are not reported.
    pub fn update(&mut self, total: u64, size: u64) -> Option<f64> {
        self.seen += size;
        if total == 0 {
            return None;
        }

        let pct = self.seen as f64 / total as f64 * 100.0;
        if pct > self.last_pct {
            self.last_pct = pct;
            Some(pct)
        } else {
            None
        }
    }

    /// A callback printing `"<name> <pct> % done"` to standard output.
    pub fn into_callback(mut self) -> impl FnMut(u64, u64) + Send + 'static {
        move |total, size| {
            if let Some(pct) = self.update(total, size) {
                println!("{} {:.2} % done", self.name, pct);
            }
        }
    }
}
