//! Message definitions and encoding.
//!
//! Every message travels as a `Message` wrapper holding the message type,
//! the uncompressed payload size and the payload bytes. Payload and wrapper
//! are both encoded with the same `Encoding`, picked on both ends of the
//! connection beforehand.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

mod sim;

pub use sim::*;

/// Enumerates all message types known to the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MessageType {
    LoadModelRequest = 0,
    SetParameterRequest = 1,
    ResetRequest = 2,
    SampleRequest = 3,
    SampleResponse = 4,
    CloseRequest = 5,
    Ack = 6,
}

/// Structs that can be sent as message payloads.
pub trait Payload: Serialize + DeserializeOwned {
    fn type_(&self) -> MessageType;
}

/// Wrapper around a single encoded payload.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Message {
    /// Message type code
    type_: u8,
    /// Size of uncompressed payload
    payload_size: u32,
    payload: Vec<u8>,
}

impl Message {
    /// Creates a complete `Message` from a payload struct, optionally
    /// compressing the payload.
    pub fn from_payload<P: Payload>(payload: P, encoding: Encoding, compress: bool) -> Result<Message> {
        let bytes = pack(&payload, encoding)?;
        let payload_size = bytes.len() as u32;
        let bytes = if compress {
            // keep the original when compression doesn't pay off
            match compress_bytes(&bytes)? {
                Some(c) if c.len() < bytes.len() => c,
                _ => bytes,
            }
        } else {
            bytes
        };
        Ok(Message {
            type_: payload.type_().into(),
            payload_size,
            payload: bytes,
        })
    }

    pub fn type_(&self) -> Result<MessageType> {
        Ok(MessageType::try_from(self.type_)?)
    }

    /// Unpacks the payload, checking that the message is of the type the
    /// payload struct expects.
    pub fn unpack_payload<P: Payload>(&self, expected: MessageType, encoding: Encoding) -> Result<P> {
        let found = self.type_()?;
        if found != expected {
            return Err(Error::UnexpectedMessage { expected, found });
        }
        // payloads are only sent compressed when that makes them smaller
        if self.payload_size as usize != self.payload.len() {
            let bytes = decompress_bytes(&self.payload, self.payload_size)?;
            unpack(&bytes, encoding)
        } else {
            unpack(&self.payload, encoding)
        }
    }

    pub fn to_bytes(&self, encoding: Encoding) -> Result<Vec<u8>> {
        pack(self, encoding)
    }

    pub fn from_bytes(bytes: &[u8], encoding: Encoding) -> Result<Message> {
        unpack(bytes, encoding)
    }
}

/// Serialization format used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Fast binary format, useful for communicating directly between Rust apps
    Bincode,
    /// Binary format with implementations in many different languages
    MsgPack,
    /// Very common but more verbose format
    Json,
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Bincode
    }
}

impl FromStr for Encoding {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let e = match s.to_lowercase().as_str() {
            "bincode" | "bin" => Self::Bincode,
            "msgpack" | "messagepack" | "rmp" => Self::MsgPack,
            "json" => Self::Json,
            _ => {
                return Err(Error::Other(format!(
                    "failed parsing encoding from string: {}",
                    s
                )))
            }
        };
        Ok(e)
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bincode => write!(f, "bincode"),
            Self::MsgPack => write!(f, "msgpack"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Packs serializable object to bytes based on selected encoding.
pub(crate) fn pack<S: Serialize>(obj: &S, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Bincode => Ok(bincode::serialize(obj)?),
        Encoding::MsgPack => pack_msgpack(obj),
        Encoding::Json => pack_json(obj),
    }
}

/// Unpacks object from bytes based on selected encoding.
pub(crate) fn unpack<P: DeserializeOwned>(bytes: &[u8], encoding: Encoding) -> Result<P> {
    match encoding {
        Encoding::Bincode => Ok(bincode::deserialize(bytes)?),
        Encoding::MsgPack => unpack_msgpack(bytes),
        Encoding::Json => unpack_json(bytes),
    }
}

#[cfg(feature = "msgpack_encoding")]
fn pack_msgpack<S: Serialize>(obj: &S) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(obj)?)
}

#[cfg(not(feature = "msgpack_encoding"))]
fn pack_msgpack<S: Serialize>(_obj: &S) -> Result<Vec<u8>> {
    Err(Error::EncodingUnavailable(Encoding::MsgPack))
}

#[cfg(feature = "msgpack_encoding")]
fn unpack_msgpack<P: DeserializeOwned>(bytes: &[u8]) -> Result<P> {
    Ok(rmp_serde::from_read_ref(bytes)?)
}

#[cfg(not(feature = "msgpack_encoding"))]
fn unpack_msgpack<P: DeserializeOwned>(_bytes: &[u8]) -> Result<P> {
    Err(Error::EncodingUnavailable(Encoding::MsgPack))
}

#[cfg(feature = "json_encoding")]
fn pack_json<S: Serialize>(obj: &S) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(obj)?)
}

#[cfg(not(feature = "json_encoding"))]
fn pack_json<S: Serialize>(_obj: &S) -> Result<Vec<u8>> {
    Err(Error::EncodingUnavailable(Encoding::Json))
}

#[cfg(feature = "json_encoding")]
fn unpack_json<P: DeserializeOwned>(bytes: &[u8]) -> Result<P> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(not(feature = "json_encoding"))]
fn unpack_json<P: DeserializeOwned>(_bytes: &[u8]) -> Result<P> {
    Err(Error::EncodingUnavailable(Encoding::Json))
}

#[cfg(feature = "lz4")]
fn compress_bytes(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    lz4::block::compress(bytes, None, false)
        .map(Some)
        .map_err(|e| Error::Compression(e.to_string()))
}

#[cfg(not(feature = "lz4"))]
fn compress_bytes(_bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(None)
}

#[cfg(feature = "lz4")]
fn decompress_bytes(bytes: &[u8], size: u32) -> Result<Vec<u8>> {
    lz4::block::decompress(bytes, Some(size as i32)).map_err(|e| Error::Compression(e.to_string()))
}

#[cfg(not(feature = "lz4"))]
fn decompress_bytes(_bytes: &[u8], _size: u32) -> Result<Vec<u8>> {
    Err(Error::Compression(
        "received compressed payload, lz4 feature is not enabled".to_string(),
    ))
}
