//! Local file transport.
//!
//! Lets add-ons be installed from a mirror directory or removable media using
//! the same download path as HTTP sources.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use super::error::{TransportError, TransportResult};
use super::{ByteStream, Transport};
use crate::addon::AddonRef;

/// Reads packages from the local filesystem.
#[derive(Debug, Default, Clone)]
pub struct FileTransport;

impl FileTransport {
    /// Create a new file transport.
    pub fn new() -> Self {
        Self
    }

    fn path_for(source: &str) -> PathBuf {
        PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
    }
}

impl Transport for FileTransport {
    fn open_stream(&self, addon: &AddonRef) -> TransportResult<Box<dyn ByteStream>> {
        let path = Self::path_for(&addon.source);
        let file = File::open(&path).map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;

        let expected_len = file.metadata().ok().map(|m| m.len());

        Ok(Box::new(FileStream {
            path,
            reader: Some(BufReader::new(file)),
            expected_len,
        }))
    }
}

struct FileStream {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    expected_len: Option<u64>,
}

impl ByteStream for FileStream {
    fn expected_len(&self) -> Option<u64> {
        self.expected_len
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };

        reader.read(buf).map_err(|e| TransportError::Read {
            source_url: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn abort(&mut self) {
        self.reader = None;
    }
}
