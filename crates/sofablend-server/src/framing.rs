//! Tagged message framing.
//!
//! Each message on the wire is `<SOFABlender>` + JSON body +
//! `</SOFABlender>`. A connection may deliver a message in any number of
//! chunks, or several messages in one chunk.

use log::warn;
use nom::{bytes::complete::take_until, IResult};

/// Opening delimiter of a message.
pub const OPEN_TAG: &[u8] = b"<SOFABlender>";
/// Closing delimiter of a message.
pub const CLOSE_TAG: &[u8] = b"</SOFABlender>";

/// Bytes before the next opening tag.
fn junk(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_until(OPEN_TAG)(input)
}

/// Bytes before the next closing tag.
fn body(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_until(CLOSE_TAG)(input)
}

/// Reassembles tagged messages from a byte stream.
///
/// Once the buffer starts with an opening tag, `scanned` records how far the
/// search for the closing tag got, so each byte is looked at a bounded
/// number of times however many chunks a message spans.
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    max_message_bytes: Option<usize>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the bytes buffered for an incomplete message.
    pub fn with_max_message_bytes(mut self, max_message_bytes: Option<usize>) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Append received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Bytes buffered and not yet returned.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Take the next complete message body, if the buffer holds one.
    ///
    /// Bytes before the opening tag are discarded. Bytes after the closing
    /// tag stay buffered for the next call.
    pub fn next_message(&mut self) -> Option<Vec<u8>> {
        if self.scanned == 0 && !self.sync_to_open_tag() {
            return None;
        }

        // a closing tag may straddle the previous scan boundary
        let from = self
            .scanned
            .saturating_sub(CLOSE_TAG.len() - 1)
            .max(OPEN_TAG.len());
        let end = body(&self.buffer[from..])
            .ok()
            .map(|(_, before)| from + before.len());
        if let Some(end) = end {
            let message = self.buffer[OPEN_TAG.len()..end].to_vec();
            self.buffer.drain(..end + CLOSE_TAG.len());
            self.scanned = 0;
            return Some(message);
        }
        self.scanned = self.buffer.len();

        if let Some(limit) = self.max_message_bytes {
            if self.buffer.len() > limit {
                warn!(
                    "dropping {} buffered bytes: no closing tag within {} bytes",
                    self.buffer.len(),
                    limit
                );
                self.buffer.clear();
                self.scanned = 0;
            }
        }
        None
    }

    /// Drop bytes before the next opening tag. False when there is none yet.
    fn sync_to_open_tag(&mut self) -> bool {
        match junk(&self.buffer).map(|(_, skipped)| skipped.len()) {
            Ok(0) => true,
            Ok(skipped) => {
                self.buffer.drain(..skipped);
                true
            }
            Err(_) => {
                // keep a tail that may be the start of an opening tag
                let keep = OPEN_TAG.len() - 1;
                if self.buffer.len() > keep {
                    self.buffer.drain(..self.buffer.len() - keep);
                }
                false
            }
        }
    }
}
