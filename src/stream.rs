//! Decoding of generation events from JSON Lines.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::model::{Completion, Delta, FailureCause, StreamEvent};

/// What a single line means for the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Bookkeeping or unrecognised status; read the next line.
    Skip,
    /// Session acknowledged by the server; record the id and read the next line.
    Session(String),
    /// Emit the event and keep reading.
    Emit(StreamEvent),
    /// Emit the event and stop.
    Finish(StreamEvent),
}

#[derive(Deserialize)]
struct GeneratingLine {
    delta: WireDelta,
    step: u64,
    tokens: u64,
}

#[derive(Deserialize)]
struct WireDelta {
    text: Option<String>,
    image: Option<String>,
}

#[derive(Deserialize)]
struct CompletedLine {
    cost: u64,
    cost_per_mtk: u64,
}

fn decode_failure(reason: impl std::fmt::Display) -> LineOutcome {
    let reason = reason.to_string();
    warn!(%reason, "failed to decode stream line");
    LineOutcome::Finish(StreamEvent::Failure(FailureCause::Decode(reason)))
}

/// Decode one line of the response body.
pub fn decode_line(line: &[u8]) -> LineOutcome {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => return decode_failure(format!("invalid UTF-8: {}", e)),
    };

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return decode_failure(format!("invalid JSON: {}", e)),
    };

    let Some(object) = value.as_object() else {
        return decode_failure("expected a JSON object");
    };

    match object.get("status").and_then(Value::as_str) {
        Some("error") => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            warn!(message = ?message, "server reported a generation error");
            LineOutcome::Finish(StreamEvent::Failure(FailureCause::Upstream(message)))
        }
        Some(status @ ("initialized" | "resumed")) => {
            let session_id = object.get("session_id").and_then(Value::as_str);
            debug!(status, session_id = ?session_id, "session acknowledged");
            match session_id {
                Some(id) if !id.is_empty() => LineOutcome::Session(id.to_string()),
                _ => LineOutcome::Skip,
            }
        }
        Some("generating") => match GeneratingLine::deserialize(&value) {
            Ok(line) => LineOutcome::Emit(StreamEvent::Delta(Delta {
                text: line.delta.text,
                image: line.delta.image,
                step: line.step,
                tokens: line.tokens,
            })),
            Err(e) => decode_failure(format!("malformed generating line: {}", e)),
        },
        Some("completed") => match CompletedLine::deserialize(&value) {
            Ok(line) => LineOutcome::Finish(StreamEvent::Completion(Completion {
                cost: line.cost,
                cost_per_mtk: line.cost_per_mtk,
            })),
            Err(e) => decode_failure(format!("malformed completed line: {}", e)),
        },
        other => {
            debug!(status = ?other, "skipping line with unhandled status");
            LineOutcome::Skip
        }
    }
}

/// Server-assigned session id, shared between a decoder and its caller.
///
/// Filled when an `initialized` or `resumed` line carries a `session_id`;
/// a later acknowledgment replaces an earlier one.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot(Arc<Mutex<Option<String>>>);

impl SessionSlot {
    /// The id seen so far, if any.
    pub fn get(&self) -> Option<String> {
        self.0.lock().ok().and_then(|id| id.clone())
    }

    fn set(&self, session_id: String) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(session_id);
        }
    }
}

enum DecodeState {
    AwaitingLine,
    Done,
}

/// Turn a stream of lines into generation events.
///
/// The output always ends with exactly one terminal event: a completion, or
/// a failure when a line is bad, the server reports an error, reading fails,
/// or the input runs out first. No line is pulled after the terminal event.
/// Session acknowledgments produce no event; their id goes to `session`.
pub fn decode_events<S>(lines: S, session: SessionSlot) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send,
{
    stream::unfold(
        (Box::pin(lines), DecodeState::AwaitingLine, session),
        |(mut lines, state, session)| async move {
            if let DecodeState::Done = state {
                return None;
            }

            loop {
                let event = match lines.next().await {
                    Some(Ok(line)) => match decode_line(&line) {
                        LineOutcome::Skip => continue,
                        LineOutcome::Session(id) => {
                            session.set(id);
                            continue;
                        }
                        LineOutcome::Emit(event) => {
                            return Some((event, (lines, DecodeState::AwaitingLine, session)))
                        }
                        LineOutcome::Finish(event) => event,
                    },
                    Some(Err(e)) => {
                        warn!(error = %e, "response body read failed");
                        StreamEvent::Failure(FailureCause::Transport(e.to_string()))
                    }
                    None => {
                        warn!("response body ended before completion");
                        StreamEvent::Failure(FailureCause::Truncated)
                    }
                };
                return Some((event, (lines, DecodeState::Done, session)));
            }
        },
    )
}
