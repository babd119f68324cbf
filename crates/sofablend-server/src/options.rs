//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for a [`ServerSession`](crate::ServerSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerOptions {
    /// Host name or address to listen on.
    pub host: String,
    /// TCP port; 0 picks a free one.
    pub port: u16,
    /// Start listening as soon as the application starts.
    pub auto_start: bool,
    /// Number of worker threads, and size of the pending connection queue.
    pub max_connections: usize,
    /// Socket poll interval; bounds how long shutdown waits for a worker.
    pub read_timeout_ms: u64,
    /// Drop a connection's buffer when it grows past this without holding
    /// a complete message.
    pub max_message_bytes: Option<usize>,
    /// Capacity of the event channel. Events are dropped when it is full.
    pub event_buffer: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 12345,
            auto_start: false,
            max_connections: 4,
            read_timeout_ms: 200,
            max_message_bytes: None,
            event_buffer: 1024,
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_read_timeout_ms(mut self, read_timeout_ms: u64) -> Self {
        self.read_timeout_ms = read_timeout_ms;
        self
    }

    pub fn with_max_message_bytes(mut self, max_message_bytes: Option<usize>) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Poll interval for sockets and the accept loop, never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ServerOptions::default();
        assert_eq!(options.address(), "localhost:12345");
        assert!(!options.auto_start);
        assert_eq!(options.max_connections, 4);
        assert_eq!(options.max_message_bytes, None);
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let options = ServerOptions::new().with_read_timeout_ms(0);
        assert_eq!(options.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: ServerOptions = serde_json::from_str(r#"{"port": 9000, "auto_start": true}"#).unwrap();
        assert_eq!(options.port, 9000);
        assert!(options.auto_start);
        assert_eq!(options.host, "localhost");
    }
}
