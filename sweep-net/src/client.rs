use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use sweep_core::{Call, SampleRow, SimAdapter, Value};

use crate::error::{Error, Result};
use crate::msg::*;
use crate::tcp;

/// Connection settings for `RemoteSim`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub encoding: Encoding,
    /// Compress outgoing payloads
    pub compress: bool,
    /// Read and write timeout, `None` blocks indefinitely
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            encoding: Encoding::Bincode,
            compress: false,
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Simulation adapter talking to a simulation server over tcp.
///
/// Every adapter call is a single request followed by a blocking read of the
/// response. A server that doesn't respond within the configured timeout
/// results in a `SimulationTimeout` error.
pub struct RemoteSim {
    stream: TcpStream,
    config: ClientConfig,
}

impl RemoteSim {
    /// Connects to the server at the given address.
    pub fn connect<A: ToSocketAddrs>(addr: A, config: ClientConfig) -> Result<RemoteSim> {
        let stream = match config.timeout {
            Some(timeout) => {
                let mut last_err = Error::Other("address resolved to nothing".to_string());
                let mut connected = None;
                for addr in addr.to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(s) => {
                            connected = Some(s);
                            break;
                        }
                        Err(e) => last_err = e.into(),
                    }
                }
                connected.ok_or(last_err)?
            }
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(config.timeout)?;
        stream.set_write_timeout(config.timeout)?;
        stream.set_nodelay(true)?;
        debug!("connected to simulation server at {}", stream.peer_addr()?);
        Ok(RemoteSim { stream, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request<P: Payload>(&mut self, payload: P) -> Result<Message> {
        let msg = Message::from_payload(payload, self.config.encoding, self.config.compress)?;
        tcp::send_message(&mut self.stream, &msg, self.config.encoding)?;
        tcp::read_message(&mut self.stream, self.config.encoding)
    }

    fn request_ack<P: Payload>(&mut self, payload: P) -> Result<()> {
        let resp: Ack = self
            .request(payload)?
            .unpack_payload(MessageType::Ack, self.config.encoding)?;
        match resp.error.as_str() {
            "" => Ok(()),
            _ => Err(Error::Remote(resp.error)),
        }
    }

    fn sample(&mut self, reporters: &[String], steps: usize) -> Result<Vec<SampleRow>> {
        let resp: SampleResponse = self
            .request(SampleRequest {
                reporters: reporters.to_vec(),
                steps: steps as u64,
            })?
            .unpack_payload(MessageType::SampleResponse, self.config.encoding)?;
        match resp.error.as_str() {
            "" => Ok(resp.rows),
            _ => Err(Error::Remote(resp.error)),
        }
    }
}

impl SimAdapter for RemoteSim {
    fn load_model(&mut self, path: &Path) -> sweep_core::Result<()> {
        self.request_ack(LoadModelRequest {
            path: path.to_string_lossy().to_string(),
        })
        .map_err(|e| e.into_core(Call::LoadModel))
    }

    fn apply_parameter(&mut self, name: &str, value: &Value) -> sweep_core::Result<()> {
        self.request_ack(SetParameterRequest {
            name: name.to_string(),
            value: value.clone(),
        })
        .map_err(|e| e.into_core(Call::ApplyParameter(name.to_string())))
    }

    fn reset(&mut self) -> sweep_core::Result<()> {
        self.request_ack(ResetRequest {})
            .map_err(|e| e.into_core(Call::Reset))
    }

    fn sample_over_steps(
        &mut self,
        reporters: &[String],
        steps: usize,
    ) -> sweep_core::Result<Vec<SampleRow>> {
        self.sample(reporters, steps)
            .map_err(|e| e.into_core(Call::SampleOverSteps))
    }

    fn close(&mut self) -> sweep_core::Result<()> {
        let out = self
            .request_ack(CloseRequest {})
            .map_err(|e| e.into_core(Call::Close));
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("failed shutting down stream: {}", e);
        }
        out
    }
}
