//! Calendar integration: a substitutable service client plus the two
//! scheduling tools built on it.
//!
//! The OAuth consent/refresh dance is vendor territory behind the
//! credential provider; this module only speaks the events API.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use salescope_core::credentials::CredentialProvider;

use crate::tools::{FunctionDescriptor, Tool, ToolDescriptor};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: String,
    pub end: String,
    pub html_link: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventDraft {
    pub summary: String,
    pub start_time: String,
    pub end_time: String,
    pub description: String,
    pub location: String,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar service rejected the request: {0}")]
    Service(String),
    #[error("calendar transport failed: {0}")]
    Transport(String),
    #[error("calendar credentials unavailable: {0}")]
    Credentials(String),
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn upcoming_events(
        &self,
        window_days: u32,
        max_events: usize,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    async fn create_event(&self, draft: EventDraft) -> Result<CalendarEvent, CalendarError>;
}

/// JSON-over-HTTP client with bearer auth from the credential provider.
pub struct HttpCalendarClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialProvider>,
}

impl HttpCalendarClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<CredentialProvider>,
        timeout_secs: u64,
    ) -> Result<Self, CalendarError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| CalendarError::Transport(error.to_string()))?;

        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string(), credentials })
    }

    async fn bearer(&self) -> Result<String, CalendarError> {
        let secret = self
            .credentials
            .bearer()
            .await
            .map_err(|error| CalendarError::Credentials(error.to_string()))?;
        Ok(secret.expose_secret().to_string())
    }

    async fn check_auth(&self, status: reqwest::StatusCode) -> Result<(), CalendarError> {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Drop the cached token so the next call picks up a fresh one.
            self.credentials.invalidate().await;
            return Err(CalendarError::Service(
                "authentication was rejected; credentials have been invalidated".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarClient for HttpCalendarClient {
    async fn upcoming_events(
        &self,
        window_days: u32,
        max_events: usize,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let now = Utc::now();
        let time_min = now.to_rfc3339();
        let time_max = (now + Duration::days(i64::from(window_days))).to_rfc3339();

        let response = self
            .http
            .get(format!("{}/calendars/primary/events", self.base_url))
            .bearer_auth(self.bearer().await?)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("maxResults", &max_events.to_string()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .map_err(|error| CalendarError::Transport(error.to_string()))?;

        let status = response.status();
        self.check_auth(status).await?;
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Service(format!("status {status}: {body}")));
        }

        let payload: EventsResponse = response
            .json()
            .await
            .map_err(|error| CalendarError::Transport(error.to_string()))?;

        Ok(payload.items.into_iter().map(WireEvent::into_event).collect())
    }

    async fn create_event(&self, draft: EventDraft) -> Result<CalendarEvent, CalendarError> {
        let body = json!({
            "summary": draft.summary,
            "location": draft.location,
            "description": draft.description,
            "start": wire_time(&draft.start_time),
            "end": wire_time(&draft.end_time),
            "reminders": {
                "useDefault": false,
                "overrides": [
                    {"method": "email", "minutes": 24 * 60},
                    {"method": "popup", "minutes": 10},
                ],
            },
        });

        let response = self
            .http
            .post(format!("{}/calendars/primary/events", self.base_url))
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .map_err(|error| CalendarError::Transport(error.to_string()))?;

        let status = response.status();
        self.check_auth(status).await?;
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Service(format!("status {status}: {body}")));
        }

        let created: WireEvent = response
            .json()
            .await
            .map_err(|error| CalendarError::Transport(error.to_string()))?;

        info!(event_name = "agent.calendar.event_created", summary = %draft.summary);
        Ok(created.into_event())
    }
}

/// All-day values carry no `T`; timed values do. The service expects the
/// matching field populated and the other absent.
fn wire_time(value: &str) -> Value {
    if value.contains('T') {
        json!({"dateTime": value, "timeZone": "UTC"})
    } else {
        json!({"date": value, "timeZone": "UTC"})
    }
}

#[derive(Debug, Default, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<WireEvent>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct WireEvent {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    start: WireTime,
    #[serde(default)]
    end: WireTime,
    #[serde(rename = "htmlLink", skip_serializing_if = "Option::is_none")]
    html_link: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct WireTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

impl WireTime {
    fn display(&self) -> String {
        self.date_time.clone().or_else(|| self.date.clone()).unwrap_or_default()
    }
}

impl WireEvent {
    fn into_event(self) -> CalendarEvent {
        CalendarEvent {
            summary: self.summary,
            start: self.start.display(),
            end: self.end.display(),
            html_link: self.html_link,
        }
    }
}

/// `list_upcoming_events` tool: optional `max_events`, string result always.
pub struct ListUpcomingEventsTool {
    client: Arc<dyn CalendarClient>,
    window_days: u32,
    default_max_events: usize,
}

impl ListUpcomingEventsTool {
    pub const NAME: &'static str = "list_upcoming_events";

    pub fn new(client: Arc<dyn CalendarClient>, window_days: u32, default_max_events: usize) -> Self {
        Self { client, window_days, default_max_events }
    }
}

#[async_trait]
impl Tool for ListUpcomingEventsTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: Self::NAME.to_string(),
                description: format!(
                    "Lists upcoming calendar events within the next {} days. \
                     Returns up to `max_events` events (default {}).",
                    self.window_days, self.default_max_events
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "max_events": {
                            "type": "integer",
                            "description": "Maximum number of events to return."
                        }
                    },
                    "required": []
                }),
            },
        }
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        let max_events = input
            .get("max_events")
            .and_then(Value::as_u64)
            .map(|value| value as usize)
            .unwrap_or(self.default_max_events);

        let text = match self.client.upcoming_events(self.window_days, max_events).await {
            Ok(events) if events.is_empty() => {
                format!("No upcoming events found in the next {} days.", self.window_days)
            }
            Ok(events) => {
                let lines: Vec<String> = events
                    .iter()
                    .map(|event| {
                        format!("- {} (Start: {}, End: {})", event.summary, event.start, event.end)
                    })
                    .collect();
                format!("Upcoming events:\n{}", lines.join("\n"))
            }
            Err(error) => format!(
                "Error listing events: {error}. Please ensure the calendar service is authenticated."
            ),
        };

        Ok(Value::String(text))
    }
}

/// `create_calendar_event` tool: summary, start and end times required.
pub struct CreateCalendarEventTool {
    client: Arc<dyn CalendarClient>,
}

impl CreateCalendarEventTool {
    pub const NAME: &'static str = "create_calendar_event";

    pub fn new(client: Arc<dyn CalendarClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateCalendarEventTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: Self::NAME.to_string(),
                description: "Creates a new calendar event. Times use ISO 8601 \
                              (\"YYYY-MM-DDTHH:MM:SS\" for timed events, \"YYYY-MM-DD\" for \
                              all-day events); UTC is assumed unless an offset is given."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "summary": {"type": "string", "description": "Title of the event."},
                        "start_time": {"type": "string", "description": "Event start, ISO 8601."},
                        "end_time": {"type": "string", "description": "Event end, ISO 8601."},
                        "description": {"type": "string", "description": "Optional details."},
                        "location": {"type": "string", "description": "Optional location."}
                    },
                    "required": ["summary", "start_time", "end_time"]
                }),
            },
        }
    }

    async fn execute(&self, input: Value) -> anyhow::Result<Value> {
        let required = |key: &str| input.get(key).and_then(Value::as_str).map(str::to_string);
        let optional =
            |key: &str| input.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

        let (Some(summary), Some(start_time), Some(end_time)) =
            (required("summary"), required("start_time"), required("end_time"))
        else {
            return Ok(Value::String(
                "ERROR: `summary`, `start_time`, and `end_time` are required to create an event."
                    .to_string(),
            ));
        };

        let draft = EventDraft {
            summary,
            start_time,
            end_time,
            description: optional("description"),
            location: optional("location"),
        };

        let text = match self.client.create_event(draft).await {
            Ok(event) => match event.html_link {
                Some(link) => format!("Event created: {link}"),
                None => "Event created.".to_string(),
            },
            Err(error) => format!(
                "Error creating event: {error}. Please ensure the date/time format is correct \
                 (YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD) and the service is authenticated."
            ),
        };

        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::tools::Tool;

    use super::{
        wire_time, CalendarClient, CalendarError, CalendarEvent, CreateCalendarEventTool,
        EventDraft, EventsResponse, ListUpcomingEventsTool,
    };

    struct FixtureCalendar {
        events: Vec<CalendarEvent>,
        fail: bool,
    }

    #[async_trait]
    impl CalendarClient for FixtureCalendar {
        async fn upcoming_events(
            &self,
            _window_days: u32,
            max_events: usize,
        ) -> Result<Vec<CalendarEvent>, CalendarError> {
            if self.fail {
                return Err(CalendarError::Service("quota exceeded".to_string()));
            }
            Ok(self.events.iter().take(max_events).cloned().collect())
        }

        async fn create_event(&self, draft: EventDraft) -> Result<CalendarEvent, CalendarError> {
            if self.fail {
                return Err(CalendarError::Transport("connection reset".to_string()));
            }
            Ok(CalendarEvent {
                summary: draft.summary,
                start: draft.start_time,
                end: draft.end_time,
                html_link: Some("https://calendar.example.com/event/42".to_string()),
            })
        }
    }

    fn event(summary: &str) -> CalendarEvent {
        CalendarEvent {
            summary: summary.to_string(),
            start: "2026-09-01T10:00:00Z".to_string(),
            end: "2026-09-01T11:00:00Z".to_string(),
            html_link: None,
        }
    }

    #[tokio::test]
    async fn listing_formats_events_one_per_line() {
        let client =
            Arc::new(FixtureCalendar { events: vec![event("Promo sync"), event("QBR")], fail: false });
        let tool = ListUpcomingEventsTool::new(client, 7, 10);

        let result = tool.execute(json!({})).await.expect("tool should not error");

        let text = result.as_str().expect("result should be a string");
        assert!(text.starts_with("Upcoming events:\n"));
        assert!(text.contains("- Promo sync (Start: 2026-09-01T10:00:00Z, End: 2026-09-01T11:00:00Z)"));
        assert!(text.contains("- QBR"));
    }

    #[tokio::test]
    async fn listing_with_no_events_reports_the_window() {
        let client = Arc::new(FixtureCalendar { events: vec![], fail: false });
        let tool = ListUpcomingEventsTool::new(client, 7, 10);

        let result = tool.execute(json!({})).await.expect("tool should not error");

        assert_eq!(
            result,
            Value::String("No upcoming events found in the next 7 days.".to_string())
        );
    }

    #[tokio::test]
    async fn listing_respects_the_max_events_argument() {
        let client = Arc::new(FixtureCalendar {
            events: vec![event("one"), event("two"), event("three")],
            fail: false,
        });
        let tool = ListUpcomingEventsTool::new(client, 7, 10);

        let result = tool.execute(json!({"max_events": 1})).await.expect("tool should not error");

        let text = result.as_str().expect("result should be a string");
        assert!(text.contains("- one"));
        assert!(!text.contains("- two"));
    }

    #[tokio::test]
    async fn service_failures_become_descriptive_strings() {
        let client = Arc::new(FixtureCalendar { events: vec![], fail: true });
        let tool = ListUpcomingEventsTool::new(client, 7, 10);

        let result = tool.execute(json!({})).await.expect("tool should not error");

        let text = result.as_str().expect("result should be a string");
        assert!(text.starts_with("Error listing events:"));
        assert!(text.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn creating_an_event_returns_the_link() {
        let client = Arc::new(FixtureCalendar { events: vec![], fail: false });
        let tool = CreateCalendarEventTool::new(client);

        let result = tool
            .execute(json!({
                "summary": "Launch review",
                "start_time": "2026-09-03T09:00:00",
                "end_time": "2026-09-03T10:00:00"
            }))
            .await
            .expect("tool should not error");

        assert_eq!(
            result,
            Value::String("Event created: https://calendar.example.com/event/42".to_string())
        );
    }

    #[tokio::test]
    async fn creating_without_required_fields_is_a_correctable_error_string() {
        let client = Arc::new(FixtureCalendar { events: vec![], fail: false });
        let tool = CreateCalendarEventTool::new(client);

        let result =
            tool.execute(json!({"summary": "no times"})).await.expect("tool should not error");

        let text = result.as_str().expect("result should be a string");
        assert!(text.contains("`start_time`"));
    }

    #[test]
    fn wire_time_distinguishes_all_day_from_timed_values() {
        assert_eq!(
            wire_time("2026-09-03T09:00:00"),
            json!({"dateTime": "2026-09-03T09:00:00", "timeZone": "UTC"})
        );
        assert_eq!(wire_time("2026-09-03"), json!({"date": "2026-09-03", "timeZone": "UTC"}));
    }

    #[test]
    fn events_response_tolerates_missing_fields() {
        let payload: EventsResponse = serde_json::from_str(
            r#"{"items": [{"summary": "Standup", "start": {"date": "2026-09-04"}, "end": {}}]}"#,
        )
        .expect("payload should parse");

        let events: Vec<_> = payload.items.into_iter().map(super::WireEvent::into_event).collect();
        assert_eq!(events[0].summary, "Standup");
        assert_eq!(events[0].start, "2026-09-04");
        assert_eq!(events[0].end, "");
        assert_eq!(events[0].html_link, None);
    }
}
