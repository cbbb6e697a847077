//! A single TCP flow.
//!
//! Accumulates the flow's payload bytes in arrival order for HTTP
//! inspection. The buffer is capped: when an append would exceed the cap,
//! the oldest bytes are drained first so a long-lived flow cannot grow
//! memory without bound.

use std::time::{Duration, Instant};

use crate::packet::{Ipv4View, TcpView};

/// Default per-flow buffer cap.
pub const DEFAULT_BUFFER_CAP: usize = 512 * 1024;

/// Lifecycle state of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Traffic is still expected.
    Open,
    /// FIN/RST observed; the flow is awaiting removal.
    Closed,
}

/// One TCP flow's reassembly state. Owned exclusively by the demultiplexer.
#[derive(Debug)]
pub struct FlowSession {
    buffer: Vec<u8>,
    buffer_cap: usize,
    last_activity: Instant,
    state: FlowState,
}

impl FlowSession {
    /// Creates an open session with the default buffer cap.
    pub fn new() -> Self {
        Self::with_buffer_cap(DEFAULT_BUFFER_CAP)
    }

    /// Creates an open session with an explicit buffer cap.
    pub fn with_buffer_cap(buffer_cap: usize) -> Self {
        Self {
            buffer: Vec::new(),
            buffer_cap: buffer_cap.max(1),
            last_activity: Instant::now(),
            state: FlowState::Open,
        }
    }

    /// Appends the TCP payload of a raw packet.
    ///
    /// The demultiplexer guarantees only TCP/IPv4 packets reach here; a
    /// packet that fails to re-parse is silently ignored.
    pub fn handle_packet(&mut self, packet: &[u8]) {
        self.last_activity = Instant::now();

        let Some(ip) = Ipv4View::new(packet) else {
            return;
        };
        let Some(tcp) = TcpView::new(ip.payload()) else {
            return;
        };

        let payload = tcp.payload();
        if payload.is_empty() {
            return;
        }

        // Drain oldest bytes first if the append would exceed the cap.
        let overflow = (self.buffer.len() + payload.len()).saturating_sub(self.buffer_cap);
        if overflow > 0 {
            if overflow >= self.buffer.len() {
                self.buffer.clear();
            } else {
                self.buffer.drain(..overflow);
            }
        }

        let take = payload.len().min(self.buffer_cap);
        self.buffer.extend_from_slice(&payload[payload.len() - take..]);
    }

    /// Returns the accumulated stream without consuming it. Parsing is
    /// idempotent over this growing prefix.
    pub fn stream_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of buffered bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the buffer, after a response has been fully extracted or on
    /// flow teardown.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Marks the flow closed (FIN/RST observed).
    pub fn close(&mut self) {
        self.state = FlowState::Closed;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// True once FIN/RST was observed.
    pub fn is_closed(&self) -> bool {
        self.state == FlowState::Closed
    }

    /// Time since the last packet arrived.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

impl Default for FlowSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::testutil::tcp_packet;
    use std::net::Ipv4Addr;

    fn packet(payload: &[u8]) -> Vec<u8> {
        tcp_packet(
            Ipv4Addr::new(10, 0, 0, 1),
            40000,
            Ipv4Addr::new(1, 1, 1, 1),
            80,
            0,
            payload,
        )
    }

    #[test]
    fn payload_accumulates_in_order() {
        let mut session = FlowSession::new();
        session.handle_packet(&packet(b"HTTP/1.1 200 OK\r\n"));
        session.handle_packet(&packet(b"Content-Type: image/png\r\n"));
        assert_eq!(
            session.stream_bytes(),
            b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n"
        );
    }

    #[test]
    fn stream_bytes_does_not_consume() {
        let mut session = FlowSession::new();
        session.handle_packet(&packet(b"abc"));
        assert_eq!(session.stream_bytes(), b"abc");
        assert_eq!(session.stream_bytes(), b"abc");
    }

    #[test]
    fn reset_clears_the_buffer() {
        let mut session = FlowSession::new();
        session.handle_packet(&packet(b"abc"));
        session.reset();
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn empty_payload_is_ignored() {
        let mut session = FlowSession::new();
        session.handle_packet(&packet(b""));
        assert_eq!(session.buffered(), 0);
    }

    #[test]
    fn buffer_cap_drains_oldest_bytes() {
        let mut session = FlowSession::with_buffer_cap(8);
        session.handle_packet(&packet(b"12345678"));
        session.handle_packet(&packet(b"abcd"));
        assert_eq!(session.stream_bytes(), b"5678abcd");
    }

    #[test]
    fn oversized_single_payload_keeps_its_tail() {
        let mut session = FlowSession::with_buffer_cap(4);
        session.handle_packet(&packet(b"123456789"));
        assert_eq!(session.stream_bytes(), b"6789");
    }

    #[test]
    fn close_transitions_state() {
        let mut session = FlowSession::new();
        assert_eq!(session.state(), FlowState::Open);
        session.close();
        assert!(session.is_closed());
    }
}
