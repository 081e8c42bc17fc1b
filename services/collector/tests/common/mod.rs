//! Shared helpers for collector integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use collector::error::{DeliveryError, Result};
use collector::{ObservationEndpoint, ResponseCode, SubmitResponse};

/// Endpoint answering from a script, then with a fixed default.
pub struct ScriptedEndpoint {
    script: Mutex<VecDeque<Option<ResponseCode>>>,
    default: Option<ResponseCode>,
    message: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedEndpoint {
    /// Always answer `code`.
    pub fn always(code: ResponseCode) -> Arc<Self> {
        Self::scripted(Vec::new(), Some(code))
    }

    /// Always unreachable.
    pub fn down() -> Arc<Self> {
        Self::scripted(Vec::new(), None)
    }

    /// Answer from `script` in order (`None` = unreachable), then `default`.
    pub fn scripted(script: Vec<Option<ResponseCode>>, default: Option<ResponseCode>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            default,
            message: String::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_message(code: ResponseCode, message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            default: Some(code),
            message: message.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// `(decoder_key, payload)` of every submission, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservationEndpoint for ScriptedEndpoint {
    async fn submit(&self, payload: &str, decoder_key: &str) -> Result<SubmitResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((decoder_key.to_string(), payload.to_string()));

        let next = self.script.lock().unwrap().pop_front().unwrap_or(self.default);
        match next {
            Some(code) => Ok(SubmitResponse::new(code, self.message.clone())),
            None => Err(DeliveryError::LinkDown {
                endpoint: "scripted".into(),
                message: "connection refused".into(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
