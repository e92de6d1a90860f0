//! Minimal STOMP frame representation

use bytes::{BufMut, Bytes, BytesMut};

/// A STOMP frame: command line, headers and body
///
/// A frame with an empty command is the heart-beat sentinel and encodes to a
/// bare end-of-line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// The keep-alive frame: no command, no headers, no body
    pub fn heartbeat() -> Self {
        Self::default()
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_heartbeat(&self) -> bool {
        self.command.is_empty() && self.headers.is_empty() && self.body.is_empty()
    }

    /// First value of the named header
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize for the wire
    pub fn encode(&self) -> Bytes {
        if self.is_heartbeat() {
            return Bytes::from_static(b"\n");
        }

        let mut buf = BytesMut::with_capacity(self.command.len() + self.body.len() + 64);
        buf.put_slice(self.command.as_bytes());
        buf.put_u8(b'\n');
        for (key, value) in &self.headers {
            buf.put_slice(key.as_bytes());
            buf.put_u8(b':');
            buf.put_slice(value.as_bytes());
            buf.put_u8(b'\n');
        }
        buf.put_u8(b'\n');
        buf.put_slice(&self.body);
        buf.put_u8(0);
        buf.freeze()
    }
}
