#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use webhook_bridge::{FailureReason, Transport};

/// In-process transport whose per-URL behaviour is set by the test.
#[derive(Default)]
pub struct ScriptedTransport {
    failing: Mutex<HashMap<String, FailureReason>>,
    hanging: Mutex<HashSet<String>>,
    delivered: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every post to `url` fail with `reason`.
    pub fn fail(&self, url: &str, reason: FailureReason) {
        self.failing.lock().unwrap().insert(url.to_string(), reason);
    }

    /// Make every post to `url` wait forever.
    pub fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }

    /// Make posts to `url` succeed again.
    pub fn heal(&self, url: &str) {
        self.failing.lock().unwrap().remove(url);
        self.hanging.lock().unwrap().remove(url);
    }

    /// Envelopes accepted so far, with the URL they were posted to.
    pub fn deliveries(&self) -> Vec<(String, serde_json::Value)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, url: &str, body: Bytes) -> Result<(), FailureReason> {
        let hangs = self.hanging.lock().unwrap().contains(url);
        if hangs {
            futures::future::pending::<()>().await;
        }

        let failure = self.failing.lock().unwrap().get(url).copied();
        if let Some(reason) = failure {
            return Err(reason);
        }

        let envelope = serde_json::from_slice(&body).expect("envelope is json");
        self.delivered.lock().unwrap().push((url.to_string(), envelope));
        Ok(())
    }
}
