//! Frame reassembly from a fragmented TCP byte stream.

use tracing::warn;

use super::types::{END_MARKER, Frame, START_MARKER};

/// Unclosed-frame sanity cap. Real frames are length-byte bounded and stay
/// far below this; a buffer that grows past it without completing a frame is
/// a poisoned stream and gets dropped.
const MAX_BUFFER: usize = 4096;

/// Reassembler occupancy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblerState {
    /// No bytes pending.
    Empty,
    /// Partial data buffered, awaiting more.
    Accumulating,
}

/// Per-connection frame reassembler.
///
/// Consumes arbitrary, possibly fragmented byte chunks and emits complete
/// delimiter-bounded frames. Owned exclusively by one connection; callers
/// must not interleave `feed` calls for the same connection.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    buffer: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReassemblerState {
        if self.buffer.is_empty() {
            ReassemblerState::Empty
        } else {
            ReassemblerState::Accumulating
        }
    }

    /// Number of buffered bytes not yet resolved into frames.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk of bytes, returning every complete frame it closes.
    ///
    /// Restartable: each call processes the new bytes plus prior leftover.
    /// No frame is emitted partially and no byte is emitted twice. Bytes
    /// before the first start marker are dropped; a buffer with no start
    /// marker at all is unrecoverable garbage and is discarded, keeping only
    /// a trailing `0x78` that may be the first half of a marker split across
    /// chunks.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.buffer, START_MARKER, 0) else {
                let keep_tail = self.buffer.last() == Some(&START_MARKER[0]);
                let dropped = self.buffer.len() - usize::from(keep_tail);
                if dropped > 0 {
                    warn!("Dropping {dropped} bytes with no start marker");
                }
                if keep_tail {
                    self.buffer.drain(..self.buffer.len() - 1);
                } else {
                    self.buffer.clear();
                }
                break;
            };

            if start > 0 {
                warn!("Dropping {start} bytes before start marker");
                self.buffer.drain(..start);
            }

            // End marker sits at index 4 at the earliest (start + length +
            // type precede it in the shortest envelope).
            let Some(end) = find_marker(&self.buffer, END_MARKER, 4) else {
                // Frame still open; await more data.
                if self.buffer.len() > MAX_BUFFER {
                    warn!(
                        "Dropping {} bytes: frame never closed",
                        self.buffer.len()
                    );
                    self.buffer.clear();
                }
                break;
            };

            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            frames.push(Frame::from_bytes(frame));
        }

        frames
    }
}

/// Index of the first occurrence of a 2-byte marker at or after `from`.
fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if haystack.len() < from + 2 {
        return None;
    }
    haystack[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|i| i + from)
}
