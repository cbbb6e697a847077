//! Warden Tunnel - raw packet capture, flow reconstruction, and HTTP
//! extraction.
//!
//! This crate owns the tunnel-device read path: it parses raw IPv4/TCP
//! headers, groups packets into per-flow sessions keyed by the 4-tuple,
//! and recovers HTTP image responses from the reassembled byte streams.
//!
//! The routing path is deliberately thin: it runs on the same thread that
//! reads the tunnel device, so it never blocks, never touches the
//! classifier, and drops out-of-scope traffic (non-IPv4, non-TCP)
//! silently. Packets are never withheld at this layer - blocking happens
//! downstream, driven by analysis decisions.
//!
//! ## Architecture
//!
//! ```text
//! tunnel read ──> FlowDemultiplexer ──> FlowSession (per 4-tuple)
//!                                            │ stream_bytes()
//!                                            ▼
//!                                      http::extract_body ──> AnalysisQueue
//! ```

pub mod demux;
pub mod http;
pub mod packet;
pub mod session;

pub use demux::{FlowDemultiplexer, FlowKey, DEFAULT_IDLE_TIMEOUT};
pub use http::{extract_body, is_http_image_response, parse_exchange, HttpExchange};
pub use packet::{Ipv4View, TcpFlags, TcpView, MIN_IPV4_HEADER, MIN_TCP_HEADER, PROTO_TCP};
pub use session::{FlowSession, FlowState, DEFAULT_BUFFER_CAP};
