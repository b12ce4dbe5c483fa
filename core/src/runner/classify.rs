use serde_json::Value;

/// Closed set of meanings a provider event line can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    LiveSession { url: String },
    Step { message: String },
    Completed { result: Value },
    Failed { message: String },
    Unrecognized,
}

const DEFAULT_FAILURE: &str = "Agent automation failed";
const DEFAULT_STEP: &str = "Working...";

/// Decode one stream line into a JSON object. Accepts bare NDJSON and SSE
/// `data:` lines; blank lines, SSE comments and other SSE fields yield `None`.
pub fn parse_event_line(line: &str) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None if line.starts_with('{') => line,
        None => return None,
    };
    match serde_json::from_str::<Value>(payload) {
        Ok(v) if v.is_object() => Some(v),
        _ => None,
    }
}

/// Convenience for the streaming loop: unparseable lines are `Unrecognized`.
pub fn classify_line(line: &str) -> Vec<ProviderEvent> {
    match parse_event_line(line) {
        Some(v) => classify(&v),
        None => vec![ProviderEvent::Unrecognized],
    }
}

/// The single classification point for provider events.
///
/// A line may carry a live-session handle alongside its primary meaning, so
/// the handle (if any) comes first. Failure is checked before completion.
pub fn classify(event: &Value) -> Vec<ProviderEvent> {
    let mut out = Vec::with_capacity(2);

    if let Some(url) = str_field(event, "streamingUrl") {
        out.push(ProviderEvent::LiveSession {
            url: url.to_string(),
        });
    }

    let kind = str_field(event, "type").unwrap_or_default();
    let status = str_field(event, "status").unwrap_or_default();

    let primary = if kind.eq_ignore_ascii_case("ERROR") || status.eq_ignore_ascii_case("FAILED") {
        let message = str_field(event, "message")
            .or_else(|| str_field(event, "error"))
            .unwrap_or(DEFAULT_FAILURE);
        Some(ProviderEvent::Failed {
            message: message.to_string(),
        })
    } else if kind.eq_ignore_ascii_case("COMPLETE") || status.eq_ignore_ascii_case("COMPLETED") {
        Some(ProviderEvent::Completed {
            result: completion_payload(event),
        })
    } else {
        step_message(event, kind).map(|message| ProviderEvent::Step { message })
    };

    match primary {
        Some(ev) => out.push(ev),
        None if out.is_empty() => out.push(ProviderEvent::Unrecognized),
        None => {}
    }
    out
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// A step is a `STEP` line or any line naming a `purpose` or `action`; a bare
/// `message` on another type is not enough.
fn step_message(event: &Value, kind: &str) -> Option<String> {
    let purpose = str_field(event, "purpose");
    let action = str_field(event, "action");
    if !kind.eq_ignore_ascii_case("STEP") && purpose.is_none() && action.is_none() {
        return None;
    }
    let text = str_field(event, "message")
        .or(purpose)
        .or(action)
        .unwrap_or(DEFAULT_STEP);
    Some(text.to_string())
}

/// `resultJson` may arrive as an object or as a JSON-encoded string.
fn completion_payload(event: &Value) -> Value {
    let raw = event
        .get("resultJson")
        .or_else(|| event.get("result"))
        .cloned()
        .unwrap_or(Value::Null);
    match raw {
        Value::String(s) => serde_json::from_str::<Value>(s.trim()).unwrap_or(Value::String(s)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_sse_and_bare_lines() {
        assert_eq!(parse_event_line(r#"data: {"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(parse_event_line(r#"data:{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(parse_event_line(r#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(parse_event_line(": keep-alive"), None);
        assert_eq!(parse_event_line("event: message"), None);
        assert_eq!(parse_event_line("data: [DONE]"), None);
        assert_eq!(parse_event_line(""), None);
    }

    #[test]
    fn live_session_rides_along_with_primary_event() {
        let ev = json!({"type": "STEP", "purpose": "open repo", "streamingUrl": "https://live/1"});
        assert_eq!(
            classify(&ev),
            vec![
                ProviderEvent::LiveSession {
                    url: "https://live/1".into()
                },
                ProviderEvent::Step {
                    message: "open repo".into()
                },
            ]
        );
    }

    #[test]
    fn step_text_falls_back_through_fields() {
        assert_eq!(
            classify(&json!({"action": "click"})),
            vec![ProviderEvent::Step {
                message: "click".into()
            }]
        );
        assert_eq!(
            classify(&json!({"type": "STEP"})),
            vec![ProviderEvent::Step {
                message: DEFAULT_STEP.into()
            }]
        );
    }

    #[test]
    fn step_prefers_message_over_purpose() {
        let ev = json!({"type": "STEP", "purpose": "p", "message": "m"});
        assert_eq!(classify(&ev), vec![ProviderEvent::Step { message: "m".into() }]);
        let ev = json!({"purpose": "open repo", "action": "click"});
        assert_eq!(
            classify(&ev),
            vec![ProviderEvent::Step {
                message: "open repo".into()
            }]
        );
    }

    #[test]
    fn completion_parses_string_result() {
        let ev = json!({"type": "COMPLETE", "resultJson": "{\"score\": 90}"});
        assert_eq!(
            classify(&ev),
            vec![ProviderEvent::Completed {
                result: json!({"score": 90})
            }]
        );

        let ev = json!({"status": "completed", "resultJson": "plain words"});
        assert_eq!(
            classify(&ev),
            vec![ProviderEvent::Completed {
                result: json!("plain words")
            }]
        );
    }

    #[test]
    fn failure_wins_over_completion() {
        let ev = json!({"type": "COMPLETE", "status": "FAILED", "message": "blocked"});
        assert_eq!(
            classify(&ev),
            vec![ProviderEvent::Failed {
                message: "blocked".into()
            }]
        );
        assert_eq!(
            classify(&json!({"type": "ERROR"})),
            vec![ProviderEvent::Failed {
                message: DEFAULT_FAILURE.into()
            }]
        );
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        assert_eq!(classify(&json!({"type": "HEARTBEAT"})), vec![ProviderEvent::Unrecognized]);
        assert_eq!(
            classify(&json!({"type": "HEARTBEAT", "message": "ping"})),
            vec![ProviderEvent::Unrecognized]
        );
        assert_eq!(classify(&json!({"message": "hello"})), vec![ProviderEvent::Unrecognized]);
        assert_eq!(classify_line("garbage"), vec![ProviderEvent::Unrecognized]);
    }
}
