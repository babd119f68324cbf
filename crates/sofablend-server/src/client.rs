//! Streaming client: sends tagged live messages to a server.

use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use log::debug;
use sofablend_io::{LiveMessage, SourceNode};

use crate::error::Result;
use crate::framing::{CLOSE_TAG, OPEN_TAG};

/// Body bytes written per call.
pub const CHUNK_SIZE: usize = 4096;

/// A connection streaming live messages.
#[derive(Debug)]
pub struct StreamClient {
    stream: TcpStream,
    iteration: u64,
}

impl StreamClient {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        debug!("connected to {}", stream.peer_addr()?);
        Ok(Self { stream, iteration: 0 })
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    /// Number of messages sent so far; the iteration of the next
    /// [`send_node`](Self::send_node).
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Send one message: opening tag, body in [`CHUNK_SIZE`] pieces,
    /// closing tag.
    pub fn send(&mut self, message: &LiveMessage) -> Result<()> {
        let body = serde_json::to_vec(message)?;
        self.stream.write_all(OPEN_TAG)?;
        for chunk in body.chunks(CHUNK_SIZE) {
            self.stream.write_all(chunk)?;
        }
        self.stream.write_all(CLOSE_TAG)?;
        self.stream.flush()?;
        self.iteration += 1;
        Ok(())
    }

    /// Send a node tree stamped with the current iteration; returns it.
    pub fn send_node(&mut self, root: &SourceNode) -> Result<u64> {
        let iteration = self.iteration;
        self.send(&LiveMessage::new(iteration, root.clone()))?;
        Ok(iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::FrameDecoder;
    use crate::handler::decode_message;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_send_frames_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let reader = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes).unwrap();
            bytes
        });

        let mut client = StreamClient::connect(addr).unwrap();
        let big = SourceNode::new(&"x".repeat(3 * CHUNK_SIZE));
        assert_eq!(client.send_node(&SourceNode::new("root")).unwrap(), 0);
        assert_eq!(client.send_node(&big).unwrap(), 1);
        assert_eq!(client.iteration(), 2);
        drop(client);

        let mut decoder = FrameDecoder::new();
        decoder.push(&reader.join().unwrap());
        let first = decode_message(&decoder.next_message().unwrap()).unwrap();
        let second = decode_message(&decoder.next_message().unwrap()).unwrap();
        assert!(decoder.next_message().is_none());
        assert_eq!(first.iteration, 0);
        assert_eq!(second.iteration, 1);
        assert_eq!(second.root, big);
    }
}
