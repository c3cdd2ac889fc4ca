//! Byte transports for package sources.
//!
//! The downloader only sees the [`Transport`] and [`ByteStream`] traits, so
//! tests can script exactly which bytes and errors arrive.
//!
//! ```text
//! Downloader ──► Transport::open_stream ──► ByteStream::read_chunk (loop)
//!                    ├── HttpTransport  (reqwest blocking)
//!                    └── FileTransport  (local files)
//! ```

mod error;
mod file;
mod http;

use std::sync::Arc;
use std::time::Duration;

pub use error::{TransportError, TransportResult};
pub use file::FileTransport;
pub use http::HttpTransport;

use crate::addon::AddonRef;

/// Opens byte streams for add-on sources.
pub trait Transport: Send + Sync {
    /// Open a stream for the add-on's package.
    fn open_stream(&self, addon: &AddonRef) -> TransportResult<Box<dyn ByteStream>>;
}

/// A sequential stream of package bytes.
pub trait ByteStream: Send {
    /// Total bytes the source announced, if any.
    fn expected_len(&self) -> Option<u64>;

    /// Read the next chunk into `buf`.
    ///
    /// Returns the number of bytes read; `Ok(0)` means end of stream.
    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize>;

    /// Stop the transfer and release the underlying connection.
    fn abort(&mut self) {}
}

/// Pick a transport for a source string.
///
/// `http://` and `https://` go over HTTP; anything else is treated as a
/// local path (an optional `file://` prefix is accepted).
pub fn transport_for(source: &str, timeout: Duration) -> TransportResult<Arc<dyn Transport>> {
    if is_http(source) {
        Ok(Arc::new(HttpTransport::with_timeout(timeout)?))
    } else {
        Ok(Arc::new(FileTransport::new()))
    }
}

fn is_http(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http() {
        assert!(is_http("https://example.com/a"));
        assert!(is_http("HTTP://example.com/a"));
        assert!(!is_http("file:///tmp/a"));
        assert!(!is_http("/tmp/a"));
    }

    #[test]
    fn test_transport_for_local_path() {
        assert!(transport_for("/tmp/a.tar.gz", Duration::from_secs(1)).is_ok());
    }
}
