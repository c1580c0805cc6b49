use std::io;

use num_enum::TryFromPrimitiveError;
use thiserror::Error;

use sweep_core::Call;

use crate::msg::{Encoding, MessageType};

pub type Result<T> = core::result::Result<T, Error>;

/// Enumeration of errors that may occur during network operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("timed out")]
    TimedOut,
    #[error("connection closed by peer")]
    Disconnected,
    #[error("io error: {0}")]
    Io(String),
    #[error("frame of {0} bytes exceeds the size limit")]
    FrameTooLarge(u32),

    #[error("expected {expected:?} message, got {found:?}")]
    UnexpectedMessage {
        expected: MessageType,
        found: MessageType,
    },
    #[error("unknown message code: {0}")]
    UnknownMsgCode(#[from] TryFromPrimitiveError<MessageType>),
    #[error("remote error: {0}")]
    Remote(String),

    #[error("encoding unavailable, enable the matching crate feature: {0}")]
    EncodingUnavailable(Encoding),
    #[error("bincode error: {0}")]
    BincodeError(#[from] bincode::Error),
    #[cfg(feature = "msgpack_encoding")]
    #[error("rmp_serde decode error: {0}")]
    RmpsDecodeError(#[from] rmp_serde::decode::Error),
    #[cfg(feature = "msgpack_encoding")]
    #[error("rmp_serde encode error: {0}")]
    RmpsEncodeError(#[from] rmp_serde::encode::Error),
    #[cfg(feature = "json_encoding")]
    #[error("serde_json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compression(String),

    #[error("core error: {0}")]
    CoreError(#[from] sweep_core::Error),

    #[error("other: {0}")]
    Other(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::TimedOut,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Error::Disconnected,
            _ => Error::Io(e.to_string()),
        }
    }
}

impl Error {
    /// Converts into the core error reported for the given adapter call.
    pub fn into_core(self, call: Call) -> sweep_core::Error {
        match self {
            Error::TimedOut => sweep_core::Error::SimulationTimeout { call },
            Error::CoreError(e) => e,
            Error::Remote(reason) => sweep_core::Error::command(call, reason),
            e => sweep_core::Error::command(call, e.to_string()),
        }
    }
}

#[test]
fn timeout_maps_to_core_timeout() {
    let err: Error = io::Error::new(io::ErrorKind::WouldBlock, "resource unavailable").into();
    match err.into_core(Call::Reset) {
        sweep_core::Error::SimulationTimeout { call } => assert_eq!(call, Call::Reset),
        e => panic!("unexpected: {:?}", e),
    }
    let err = Error::Remote("no such reporter".to_string()).into_core(Call::SampleOverSteps);
    assert!(matches!(err, sweep_core::Error::SimulationCommand { .. }));
}
