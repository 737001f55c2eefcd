//! Wire frames sent to the chat client. Each shape is dictated by spec.md
//! §4.8/§4.8-cancellation verbatim, which is why these are built as raw
//! `serde_json::Value`s rather than one tagged enum — `chunk` and `error`
//! frames carry no `"type"` field while `session`/`completion`/`stop`
//! frames do.

use chrono::Utc;
use serde_json::{json, Value};

/// Sent once, immediately after the socket opens, so the client learns the
/// token it must echo back as `_internal_cmd_token` in a stop control frame
/// (spec.md §4.8 cancellation) — without this the client has no way to
/// form a stop frame that `request_stop` will accept.
pub fn session(stop_token: &str) -> Value {
    json!({
        "type": "session",
        "stopToken": stop_token,
    })
}

pub fn chunk(text: &str) -> Value {
    json!({ "chunk": text })
}

pub fn completion(message: &str) -> Value {
    json!({
        "type": "completion",
        "status": "finished",
        "message": message,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

pub fn stop(message: &str) -> Value {
    json!({
        "type": "stop",
        "message": message,
        "timestamp": Utc::now().to_rfc3339(),
    })
}

pub fn error(message: &str) -> Value {
    json!({ "error": message })
}
