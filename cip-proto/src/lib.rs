//! Pure encode/decode layer for the CIP tag protocol spoken by Rockwell Logix PLCs.
//!
//! This crate has no notion of sockets or sessions: it builds request byte sequences for the
//! handful of CIP services the client needs, and parses the corresponding replies. Everything
//! that issues I/O — opening a connected session, sending a request and getting a reply, driving
//! the fragmentation and symbol/template enumeration loops — lives in the `rscip` client crate on
//! top of this one.

#![warn(missing_debug_implementations)]

#[macro_use] extern crate serde_derive;
#[macro_use] extern crate num_derive;
extern crate num_traits;
extern crate serde;
extern crate byteorder;
extern crate thiserror;

pub mod codec;
pub mod error;
pub mod framer;
pub mod model;
pub mod multi;
pub mod path;
pub mod reply;
pub mod strings;
pub mod symbol;
pub mod template;

pub use codec::{CipType, Value};
pub use error::DataError;
pub use model::{MemberType, SymbolEntry, Tag, Template, UdtDescriptor, UdtMember};
