//! Upstream response classification.
//!
//! A strict three-way partition drives the orchestrator: a body that parses
//! as the JSON reply envelope is direct data, a body that parses as JSON
//! but matches neither envelope shape is malformed, and anything that is
//! not JSON at all is a candidate challenge page. A response is never more
//! than one of these; when in doubt (parse failure) it is a challenge, so
//! the machine can never mistake a verification page for an empty success.

use serde_json::Value;

use crate::upstream::UpstreamResponse;

/// What the orchestrator should do with an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Body carried the reply envelope; markup fragments in response order.
    DirectData(Vec<String>),
    /// Body was JSON but matched neither the `reply` nor `replies` shape.
    Malformed,
    /// Body was not the JSON envelope; candidate challenge page.
    Challenge,
}

/// Classify a raw upstream response by its body.
pub fn classify(response: &UpstreamResponse) -> Classification {
    match serde_json::from_slice::<Value>(response.body()) {
        Ok(value) => classify_envelope(&value),
        Err(_) => Classification::Challenge,
    }
}

fn classify_envelope(value: &Value) -> Classification {
    let Some(object) = value.as_object() else {
        return Classification::Malformed;
    };

    if let Some(reply) = object.get("reply") {
        return match reply.as_str() {
            Some(fragment) => Classification::DirectData(vec![fragment.to_string()]),
            None => Classification::Malformed,
        };
    }

    if let Some(replies) = object.get("replies") {
        let Some(items) = replies.as_array() else {
            return Classification::Malformed;
        };
        let mut fragments = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(fragment) => fragments.push(fragment.to_string()),
                None => return Classification::Malformed,
            }
        }
        return Classification::DirectData(fragments);
    }

    Classification::Malformed
}
