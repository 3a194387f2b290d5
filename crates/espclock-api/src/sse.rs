//! Server-sent-events framing for the device's `/api/events` stream.
//!
//! The device speaks a narrow dialect: every line is `field: value` with
//! `field` one of `id`, `event`, `data`, and a blank line closes the block.
//! Anything else is a framing error, not something to skip over.
//!
//! [`EventParser`] is the synchronous state machine; [`events`] lifts it over
//! an async line stream.

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};

use crate::error::Error;

const FIELD_DELIMITER: &str = ": ";

// ── Event ────────────────────────────────────────────────────────────

/// One SSE record from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Optional `id:` field.
    pub id: Option<String>,
    /// Event name, e.g. `"light"`, `"pong"`, `"error"`.
    pub event: String,
    /// Raw payload text; repeated `data:` lines are joined with `\n`.
    pub data: String,
}

// ── EventParser ──────────────────────────────────────────────────────

/// Accumulates fields for the current block and emits an [`Event`] on the
/// terminating blank line.
///
/// Not resumable after an error: the caller is expected to drop the stream.
#[derive(Debug, Default)]
pub struct EventParser {
    id: Option<String>,
    event: Option<String>,
    data: Option<String>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns `Some(event)` when the line closes a block.
    pub fn push_line(&mut self, line: &str) -> Result<Option<Event>, Error> {
        let line = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .unwrap_or(line);

        if line.is_empty() {
            return self.flush();
        }

        let Some((field, value)) = line.split_once(FIELD_DELIMITER) else {
            return Err(Error::event_format(format!("line without field delimiter: {line:?}")));
        };

        match field {
            "data" => match self.data {
                Some(ref mut data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_owned()),
            },
            "id" => set_once(&mut self.id, field, value)?,
            "event" => set_once(&mut self.event, field, value)?,
            other => return Err(Error::event_format(format!("unknown field `{other}`"))),
        }

        Ok(None)
    }

    /// Whether a block is partially accumulated.
    pub fn is_pending(&self) -> bool {
        self.id.is_some() || self.event.is_some() || self.data.is_some()
    }

    fn flush(&mut self) -> Result<Option<Event>, Error> {
        if !self.is_pending() {
            return Ok(None);
        }

        let id = self.id.take();
        let event = self.event.take();
        let data = self.data.take();

        let Some(data) = data else {
            return Err(Error::event_format("event block without `data`"));
        };
        let Some(event) = event else {
            return Err(Error::event_format("event block without `event`"));
        };

        Ok(Some(Event { id, event, data }))
    }
}

fn set_once(slot: &mut Option<String>, field: &str, value: &str) -> Result<(), Error> {
    if slot.is_some() {
        return Err(Error::event_format(format!("duplicate `{field}` in event block")));
    }
    *slot = Some(value.to_owned());
    Ok(())
}

// ── Stream adapter ───────────────────────────────────────────────────

/// Turn a stream of body lines into a stream of [`Event`]s.
///
/// Line errors pass through unchanged. A block still open when the line
/// stream ends is dropped, since only a blank line flushes.
pub fn events<S>(lines: S) -> impl Stream<Item = Result<Event, Error>> + Send + 'static
where
    S: Stream<Item = Result<String, Error>> + Send + Unpin + 'static,
{
    try_stream! {
        let mut lines = lines;
        let mut parser = EventParser::new();

        while let Some(line) = lines.next().await {
            let line = line?;
            if let Some(event) = parser.push_line(&line)? {
                tracing::trace!(event = %event.event, "event frame parsed");
                yield event;
            }
        }

        if parser.is_pending() {
            tracing::debug!("event stream ended mid-block, dropping partial event");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::stream;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_all(input: &str) -> Result<Vec<Event>, Error> {
        let mut parser = EventParser::new();
        let mut out = Vec::new();
        for line in input.split_inclusive('\n') {
            if let Some(event) = parser.push_line(line)? {
                out.push(event);
            }
        }
        Ok(out)
    }

    #[test]
    fn single_block_yields_one_event() {
        let events = parse_all("event: light\ndata: {\"state\": true}\n\n").unwrap();
        assert_eq!(
            events,
            vec![Event {
                id: None,
                event: "light".into(),
                data: "{\"state\": true}".into(),
            }]
        );
    }

    #[test]
    fn id_is_captured() {
        let events = parse_all("id: 7\nevent: pong\ndata: {}\n\n").unwrap();
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(events[0].event, "pong");
    }

    #[test]
    fn repeated_data_lines_are_joined() {
        let events = parse_all("event: info\ndata: {\"name\":\ndata: \"clock\"}\n\n").unwrap();
        assert_eq!(events[0].data, "{\"name\":\n\"clock\"}");
    }

    #[test]
    fn multiple_blocks_and_stray_blank_lines() {
        let input = "\n\nevent: a\ndata: 1\n\n\nevent: b\ndata: 2\n\n";
        let names: Vec<String> = parse_all(input).unwrap().into_iter().map(|e| e.event).collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let events = parse_all("event: light\r\ndata: {}\r\n\r\n").unwrap();
        assert_eq!(events[0].event, "light");
        assert_eq!(events[0].data, "{}");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_all("foo: bar\n").unwrap_err();
        assert!(matches!(err, Error::EventFormat { .. }), "got {err:?}");
    }

    #[test]
    fn line_without_delimiter_is_rejected() {
        let err = parse_all("data:{}\n").unwrap_err();
        assert!(matches!(err, Error::EventFormat { .. }), "got {err:?}");
    }

    #[test]
    fn block_without_data_is_rejected() {
        let err = parse_all("id: 1\nevent: light\n\n").unwrap_err();
        assert!(matches!(err, Error::EventFormat { .. }), "got {err:?}");
    }

    #[test]
    fn block_without_event_name_is_rejected() {
        let err = parse_all("data: {}\n\n").unwrap_err();
        assert!(matches!(err, Error::EventFormat { .. }), "got {err:?}");
    }

    #[test]
    fn duplicate_event_or_id_is_rejected() {
        assert!(parse_all("event: a\nevent: b\n").is_err());
        assert!(parse_all("id: 1\nid: 2\n").is_err());
    }

    #[test]
    fn incomplete_trailing_block_is_dropped() {
        let events = parse_all("event: a\ndata: 1\n\nevent: b\ndata: 2\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "a");
    }

    #[tokio::test]
    async fn stream_adapter_yields_events_then_ends() {
        let lines = stream::iter(
            ["event: light", "data: {\"state\": true}", "", "event: pong", "data: {}", ""]
                .into_iter()
                .map(|l| Ok(l.to_string())),
        );

        let events: Vec<_> = events(lines).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().event, "light");
        assert_eq!(events[1].as_ref().unwrap().event, "pong");
    }

    #[tokio::test]
    async fn stream_adapter_stops_at_first_error() {
        let lines = stream::iter(
            ["event: light", "data: {}", "", "bogus", "event: late", "data: {}", ""]
                .into_iter()
                .map(|l| Ok(l.to_string())),
        );

        let events: Vec<_> = events(lines).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(Error::EventFormat { .. })));
    }

    #[tokio::test]
    async fn stream_adapter_passes_line_errors_through() {
        let lines = stream::iter(vec![
            Ok("event: light".to_string()),
            Err(Error::IdleTimeout { timeout_secs: 30 }),
        ]);

        let events: Vec<_> = events(lines).collect().await;
        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap_err().is_idle_timeout());
    }
}
