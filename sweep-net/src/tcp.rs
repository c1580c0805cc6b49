//! Length-prefixed framing over tcp streams.
//!
//! Each frame is a little-endian `u32` length followed by that many bytes
//! of an encoded `Message`.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::msg::{Encoding, Message};

/// Upper bound on accepted frame length, guards against reading garbage
/// lengths from a misbehaving peer.
pub const MAX_FRAME_SIZE: u32 = 256 * 1024 * 1024;

pub fn write_frame<W: Write>(stream: &mut W, bytes: &[u8]) -> Result<()> {
    if bytes.len() > MAX_FRAME_SIZE as usize {
        return Err(Error::FrameTooLarge(bytes.len() as u32));
    }
    let mut len_buf = [0; 4];
    LittleEndian::write_u32(&mut len_buf, bytes.len() as u32);
    stream.write_all(&len_buf)?;
    stream.write_all(bytes)?;
    stream.flush()?;
    Ok(())
}

pub fn read_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0; 4];
    stream.read_exact(&mut len_buf)?;
    let len = LittleEndian::read_u32(&len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge(len));
    }
    let mut buf = vec![0; len as usize];
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn send_message<W: Write>(stream: &mut W, msg: &Message, encoding: Encoding) -> Result<()> {
    write_frame(stream, &msg.to_bytes(encoding)?)
}

pub fn read_message<R: Read>(stream: &mut R, encoding: Encoding) -> Result<Message> {
    let bytes = read_frame(stream)?;
    Message::from_bytes(&bytes, encoding)
}
