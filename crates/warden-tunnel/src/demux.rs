//! Flow demultiplexer for the tunnel read path.
//!
//! Groups raw IPv4/TCP packets into per-flow sessions keyed by the
//! 4-tuple. This runs on the thread that reads the tunnel device: it never
//! blocks, never classifies, and stays O(packet size). Non-TCP/non-IPv4
//! traffic is dropped here without error - it is out of scope for
//! inspection and passed through unmodified by the caller.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::packet::{Ipv4View, TcpView, PROTO_TCP};
use crate::session::FlowSession;

/// Default idle timeout before a flow is evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Identity of a TCP flow. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// Source address.
    pub src_addr: Ipv4Addr,
    /// Source port.
    pub src_port: u16,
    /// Destination address.
    pub dst_addr: Ipv4Addr,
    /// Destination port.
    pub dst_port: u16,
    /// IP protocol number (always TCP here).
    pub protocol: u8,
}

impl std::fmt::Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}->{}:{}",
            self.src_addr, self.src_port, self.dst_addr, self.dst_port
        )
    }
}

/// Routes raw packets into per-flow sessions.
#[derive(Debug)]
pub struct FlowDemultiplexer {
    sessions: HashMap<FlowKey, FlowSession>,
    idle_timeout: Duration,
}

impl FlowDemultiplexer {
    /// Creates a demultiplexer with the default idle timeout.
    pub fn new() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }

    /// Creates a demultiplexer with an explicit idle timeout.
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// Routes one raw packet. Returns the key of the flow it was delivered
    /// to, or `None` if the packet was dropped (short, non-IPv4, non-TCP).
    ///
    /// FIN/RST marks the flow closed; the session sticks around until the
    /// next [`Self::evict_idle`] pass so the final response can still be
    /// parsed out of it.
    pub fn route(&mut self, packet: &[u8]) -> Option<FlowKey> {
        let ip = Ipv4View::new(packet)?;
        if ip.protocol() != PROTO_TCP {
            return None;
        }
        let tcp = TcpView::new(ip.payload())?;

        let key = FlowKey {
            src_addr: ip.src_addr(),
            src_port: tcp.src_port(),
            dst_addr: ip.dst_addr(),
            dst_port: tcp.dst_port(),
            protocol: PROTO_TCP,
        };

        let session = self.sessions.entry(key).or_insert_with(|| {
            tracing::debug!("New flow {}", key);
            FlowSession::new()
        });

        session.handle_packet(packet);

        let flags = tcp.flags();
        if flags.fin || flags.rst {
            tracing::debug!("Flow {} closed ({})", key, if flags.rst { "RST" } else { "FIN" });
            session.close();
        }

        Some(key)
    }

    /// Looks up the session for a flow.
    pub fn session(&self, key: &FlowKey) -> Option<&FlowSession> {
        self.sessions.get(key)
    }

    /// Mutable session lookup, for resetting a buffer after extraction.
    pub fn session_mut(&mut self, key: &FlowKey) -> Option<&mut FlowSession> {
        self.sessions.get_mut(key)
    }

    /// Removes a flow explicitly, returning its session.
    pub fn remove(&mut self, key: &FlowKey) -> Option<FlowSession> {
        self.sessions.remove(key)
    }

    /// Evicts closed flows and flows idle past the timeout. Returns how
    /// many were removed. Call periodically from the tunnel loop.
    pub fn evict_idle(&mut self) -> usize {
        let timeout = self.idle_timeout;
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_closed() && session.idle_for() < timeout);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} idle/closed flows", evicted);
        }
        evicted
    }

    /// Number of live flows.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no flows are tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops all flows.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

impl Default for FlowDemultiplexer {
    fn default() -> Self {
        Self::new()
    }
}
