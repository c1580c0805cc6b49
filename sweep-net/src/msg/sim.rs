//! Messages used for driving a simulation session.
//!
//! Every request is answered with exactly one response: `SampleRequest`
//! with a `SampleResponse`, everything else with an `Ack`.

use sweep_core::{SampleRow, Value};

use crate::msg::{MessageType, Payload};

/// Loads the model found at `path` on the server side.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LoadModelRequest {
    pub path: String,
}
impl Payload for LoadModelRequest {
    fn type_(&self) -> MessageType {
        MessageType::LoadModelRequest
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SetParameterRequest {
    pub name: String,
    pub value: Value,
}
impl Payload for SetParameterRequest {
    fn type_(&self) -> MessageType {
        MessageType::SetParameterRequest
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ResetRequest {}
impl Payload for ResetRequest {
    fn type_(&self) -> MessageType {
        MessageType::ResetRequest
    }
}

/// Advances the model `steps` times, sampling all `reporters` after each
/// step.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SampleRequest {
    pub reporters: Vec<String>,
    pub steps: u64,
}
impl Payload for SampleRequest {
    fn type_(&self) -> MessageType {
        MessageType::SampleRequest
    }
}

/// Sampled rows in step order. `error` is empty on success.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SampleResponse {
    pub error: String,
    pub rows: Vec<SampleRow>,
}
impl Payload for SampleResponse {
    fn type_(&self) -> MessageType {
        MessageType::SampleResponse
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CloseRequest {}
impl Payload for CloseRequest {
    fn type_(&self) -> MessageType {
        MessageType::CloseRequest
    }
}

/// Generic response. `error` is empty on success.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Ack {
    pub error: String,
}
impl Payload for Ack {
    fn type_(&self) -> MessageType {
        MessageType::Ack
    }
}
