//! The capability boundary between the CIP tag-protocol core and an actual EtherNet/IP
//! connection.
//!
//! Everything below this trait — session registration, Forward Open/Close, TCP framing, the
//! encapsulation and Common Packet Format headers — is out of scope for this crate: it assumes a
//! `Transport` has already been wired up to a specific controller and can ship a CIP message
//! inside an established connected session.

use std::fmt::Debug;

/// A connected CIP session to a controller.
///
/// Implementations own the actual socket, the encapsulation/CPF framing, and the per-session
/// sequence counter. The client core calls into a `Transport` strictly sequentially: it never
/// issues a second request before the previous one's reply (or failure) has been observed.
pub trait Transport: Debug {
    /// Establishes the connected session (Forward Open) if it isn't already open.
    ///
    /// Returns `false` on failure. The client will not retry automatically.
    fn forward_open(&mut self) -> bool;

    /// Whether a connected session is currently open.
    fn is_connected(&self) -> bool;

    /// Ships one CIP service request (`service`, `path`, `body` as built by `cip_proto::framer`)
    /// over the connected session and returns the raw encapsulation reply, or `None` if the
    /// transport failed to send or receive.
    fn send_unit_data(&mut self, service: u8, path: &[u8], body: &[u8]) -> Option<Vec<u8>>;
}
