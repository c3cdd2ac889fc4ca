//! HTTP transport backed by a blocking reqwest client.
//!
//! Runs on the install worker thread, so blocking reads are fine here; the
//! foreground loop never touches this type.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::debug;

use super::error::{TransportError, TransportResult};
use super::{ByteStream, Transport};
use crate::addon::AddonRef;

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP(S) package transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> TransportResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom per-request timeout.
    ///
    /// The timeout also bounds a single chunk read, which in turn bounds how
    /// long a cancel request can go unobserved.
    pub fn with_timeout(timeout: Duration) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn open_stream(&self, addon: &AddonRef) -> TransportResult<Box<dyn ByteStream>> {
        let url = addon.source.as_str();

        let response = self.client.get(url).send().map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                e.to_string()
            };
            TransportError::Connect {
                source_url: url.to_string(),
                reason,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                source_url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let expected_len = response.content_length();
        debug!(url = %url, expected_len = ?expected_len, "HTTP stream opened");

        Ok(Box::new(HttpStream {
            url: url.to_string(),
            response: Some(response),
            expected_len,
        }))
    }
}

/// Streaming body of a single GET request.
struct HttpStream {
    url: String,
    response: Option<Response>,
    expected_len: Option<u64>,
}

impl ByteStream for HttpStream {
    fn expected_len(&self) -> Option<u64> {
        self.expected_len
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        let Some(response) = self.response.as_mut() else {
            return Ok(0);
        };

        response.read(buf).map_err(|e| TransportError::Read {
            source_url: self.url.clone(),
            reason: e.to_string(),
        })
    }

    fn abort(&mut self) {
        // Dropping the response closes the connection.
        if self.response.take().is_some() {
            debug!(url = %self.url, "HTTP stream aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_default_timeout() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_http_transport_custom_timeout() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(transport.timeout().as_secs(), 5);
    }

    #[test]
    fn test_aborted_stream_reads_eof() {
        let mut stream = HttpStream {
            url: "http://example.invalid/a".to_string(),
            response: None,
            expected_len: Some(10),
        };
        let mut buf = [0u8; 8];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 0);
        stream.abort();
    }

    #[test]
    fn test_unreachable_host_is_connect_error() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let addon = AddonRef::new("x", "http://127.0.0.1:1/never.tar.gz");
        let err = transport.open_stream(&addon).err().unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
