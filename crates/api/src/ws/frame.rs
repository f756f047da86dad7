use axum::extract::ws::Message;
use conveyor_core::messages::MSG_TYPE_TASK_RESULT;
use conveyor_core::task::ResultEvent;
use serde::Serialize;

/// Wire shape of a result event: the event fields plus a `type` tag.
#[derive(Serialize)]
struct ResultFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    event: &'a ResultEvent,
}

/// Encode a result event as a WebSocket text frame.
///
/// ```text
/// { "type": "task-result", "taskId": "...", "result": "...", "completedAt": "...", "error": true }
/// ```
pub fn result_frame(event: &ResultEvent) -> Result<Message, serde_json::Error> {
    let payload = serde_json::to_string(&ResultFrame {
        kind: MSG_TYPE_TASK_RESULT,
        event,
    })?;
    Ok(Message::Text(payload.into()))
}

#[cfg(test)]
mod tests {
    use conveyor_core::task::{TaskOutput, TaskResult};

    use super::*;

    fn text(msg: Message) -> serde_json::Value {
        match msg {
            Message::Text(t) => serde_json::from_str(t.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn success_frame_is_tagged_and_flat() {
        let event = ResultEvent::from_result(
            TaskResult::success("task-x", TaskOutput::new("Processed task task-x")),
            chrono::Utc::now(),
        );

        let json = text(result_frame(&event).unwrap());

        assert_eq!(json["type"], "task-result");
        assert_eq!(json["taskId"], "task-x");
        assert_eq!(json["result"], "Processed task task-x");
        assert!(json["completedAt"].is_string());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_frame_carries_error_flag() {
        let event = ResultEvent::from_result(
            TaskResult::failure("bad", "exit code 2"),
            chrono::Utc::now(),
        );

        let json = text(result_frame(&event).unwrap());

        assert_eq!(json["error"], true);
        assert_eq!(json["result"], "Error processing task");
    }
}
