//! Exposes an in-process simulation over the network.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::Path;

use sweep_core::SimAdapter;

use crate::error::{Error, Result};
use crate::msg::*;
use crate::tcp;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub encoding: Encoding,
    /// Compress outgoing payloads
    pub compress: bool,
}

/// Serves any `SimAdapter` implementation to remote clients.
///
/// Clients are handled one at a time, each owning the simulation session
/// for the duration of its connection.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub fn bind<A: ToSocketAddrs>(addr: A, config: ServerConfig) -> Result<Server> {
        let listener = TcpListener::bind(addr)?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Server { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts a single client and serves it until it sends `CloseRequest`
    /// or disconnects.
    pub fn serve_one<A: SimAdapter>(&self, sim: &mut A) -> Result<()> {
        let (mut stream, peer) = self.listener.accept()?;
        stream.set_nodelay(true)?;
        info!("accepted client: {}", peer);
        self.handle_client(&mut stream, sim)
    }

    fn handle_client<A: SimAdapter>(&self, stream: &mut TcpStream, sim: &mut A) -> Result<()> {
        loop {
            let msg = match tcp::read_message(stream, self.config.encoding) {
                Ok(m) => m,
                Err(Error::Disconnected) => {
                    warn!("client disconnected without closing the session");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            let (response, done) = self.handle_message(sim, &msg)?;
            tcp::send_message(stream, &response, self.config.encoding)?;
            if done {
                debug!("client closed the session");
                return Ok(());
            }
        }
    }

    /// Runs the requested call on the simulation, returning the response
    /// along with whether the session is done.
    fn handle_message<A: SimAdapter>(&self, sim: &mut A, msg: &Message) -> Result<(Message, bool)> {
        let enc = self.config.encoding;
        let type_ = msg.type_()?;
        trace!("handling {:?}", type_);
        let (result, done) = match type_ {
            MessageType::LoadModelRequest => {
                let req: LoadModelRequest = msg.unpack_payload(type_, enc)?;
                (sim.load_model(Path::new(&req.path)), false)
            }
            MessageType::SetParameterRequest => {
                let req: SetParameterRequest = msg.unpack_payload(type_, enc)?;
                (sim.apply_parameter(&req.name, &req.value), false)
            }
            MessageType::ResetRequest => {
                let _: ResetRequest = msg.unpack_payload(type_, enc)?;
                (sim.reset(), false)
            }
            MessageType::SampleRequest => {
                let req: SampleRequest = msg.unpack_payload(type_, enc)?;
                let resp = match sim.sample_over_steps(&req.reporters, req.steps as usize) {
                    Ok(rows) => SampleResponse {
                        error: String::new(),
                        rows,
                    },
                    Err(e) => SampleResponse {
                        error: e.to_string(),
                        rows: vec![],
                    },
                };
                return Ok((Message::from_payload(resp, enc, self.config.compress)?, false));
            }
            MessageType::CloseRequest => {
                let _: CloseRequest = msg.unpack_payload(type_, enc)?;
                (sim.close(), true)
            }
            MessageType::SampleResponse | MessageType::Ack => {
                return Err(Error::Other(format!("unexpected message from client: {:?}", type_)))
            }
        };
        let ack = Ack {
            error: result.err().map(|e| e.to_string()).unwrap_or_default(),
        };
        Ok((Message::from_payload(ack, enc, self.config.compress)?, done))
    }
}
