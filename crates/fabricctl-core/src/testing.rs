// Scripted in-memory transport for unit tests.
//
// Responses are queued per (verb, path). The last response in a queue is
// sticky, so a status endpoint can be scripted as "A, then B forever".
// Unscripted requests fail the way an unreachable controller would.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use fabricctl_api::{Error, RawResponse, Transport, Verb};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub verb: Verb,
    pub path: String,
    pub payload: Option<Value>,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<(Verb, String), VecDeque<RawResponse>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `verb path`.
    pub(crate) fn respond(
        self,
        verb: Verb,
        path: &str,
        code: u16,
        message: &str,
        data: Value,
    ) -> Self {
        let response = RawResponse {
            return_code: code,
            message: message.into(),
            method: verb,
            request_path: path.into(),
            data,
        };
        self.routes
            .lock()
            .unwrap()
            .entry((verb, path.to_owned()))
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a `200 OK` response.
    pub(crate) fn ok(self, verb: Verb, path: &str, data: Value) -> Self {
        self.respond(verb, path, 200, "OK", data)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of calls made to `verb path`.
    pub(crate) fn count(&self, verb: Verb, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.verb == verb && c.path == path)
            .count()
    }
}

impl Transport for ScriptedTransport {
    async fn send(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<RawResponse, Error> {
        self.calls.lock().unwrap().push(Call {
            verb,
            path: path.to_owned(),
            payload: payload.cloned(),
        });

        let mut routes = self.routes.lock().unwrap();
        let Some(queue) = routes.get_mut(&(verb, path.to_owned())) else {
            return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
        };
        let response = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        Ok(response)
    }
}
