//! A tag-oriented client for the CIP protocol spoken by Rockwell ControlLogix/CompactLogix PLCs.
//!
//! The wire-level encoding/decoding lives in [`cip_proto`]; this crate adds the stateful parts:
//! a [`client::Client`] that drives fragmentation and symbol/template discovery on top of an
//! application-supplied [`transport::Transport`].

extern crate cip_proto;

#[macro_use] extern crate log;

pub mod client;
pub mod transport;

pub use cip_proto::{CipType, DataError, MemberType, SymbolEntry, Tag, Template, UdtDescriptor, UdtMember, Value};
pub use client::{Client, Options, Scope};
