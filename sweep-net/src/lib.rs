//! Networked simulation adapter for `sweep`.
//!
//! `RemoteSim` implements `SimAdapter` by forwarding each call to a
//! simulation server over tcp. `Server` is the other end of that
//! connection: it exposes any in-process `SimAdapter` using the same
//! protocol, which is useful for wrapping a simulation living in another
//! process, or for testing.
//!
//! # Protocol
//!
//! Messages are length-prefixed frames, see the `tcp` module. Payloads can
//! be encoded with bincode (always available), MessagePack
//! (`msgpack_encoding` feature) or JSON (`json_encoding` feature), and
//! optionally compressed with lz4 (`lz4` feature).

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

pub use client::{ClientConfig, RemoteSim};
pub use error::{Error, Result};
pub use msg::{Encoding, Message, MessageType};
pub use server::{Server, ServerConfig};

pub mod client;
pub mod error;
pub mod msg;
pub mod server;
pub mod tcp;

#[cfg(test)]
mod tests;
