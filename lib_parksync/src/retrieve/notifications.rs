//! # Notification Inbox API
//!
//! The REST side of the bell UI. The live channel only pushes new events;
//! the stored history, read flags and clearing live behind these endpoints:
//!
//! | Operation        | Request                                          |
//! |------------------|--------------------------------------------------|
//! | list             | `GET /api/user/notifications[?unread_only=true]` |
//! | mark one read    | `POST /api/user/notifications/{id}/read`         |
//! | mark all read    | `POST /api/user/notifications/read-all`          |
//! | clear            | `DELETE /api/user/notifications/clear`           |
//!
//! Every request carries the user's Bearer token.

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::ky_http::{ApiClient, ApiResponse};
use crate::realtime::{LoggedNotification, NotificationCategory, NotificationEvent};

const NOTIFICATIONS_PATH: &str = "api/user/notifications";

/// Failures talking to the inbox endpoints.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Request(#[from] anyhow::Error),
    /// The backend answered with a non-2xx status.
    #[error("server returned {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The backend's `detail`/`error` message, or the raw body.
        detail: String,
    },
    /// A 2xx response that should have had a body did not.
    #[error("server returned an empty body")]
    EmptyBody,
}

/// One stored notification row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredNotification {
    /// Backend id.
    pub id: i64,
    /// Headline.
    #[serde(default)]
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub body: String,
    /// Category.
    #[serde(default)]
    pub notification_type: NotificationCategory,
    /// Event payload. Some backends hand it over as a JSON-encoded string.
    #[serde(default)]
    pub data: Option<Value>,
    /// Read flag.
    #[serde(default)]
    pub is_read: bool,
    /// Creation time, RFC 3339 or a naive UTC timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl StoredNotification {
    /// Converts the row into a log entry for backfill.
    ///
    /// `now` stands in for a missing or unreadable `created_at`. Backfilled
    /// entries never count as surfaced.
    pub fn into_logged(self, now: DateTime<Utc>) -> LoggedNotification {
        let event = self.event();
        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_created_at)
            .unwrap_or(now);

        LoggedNotification {
            id: 0,
            server_id: Some(self.id),
            title: self.title,
            body: self.body,
            category: self.notification_type,
            event,
            created_at,
            read: self.is_read,
            surfaced: false,
        }
    }

    /// The `data` payload decoded as an event, with the row's own title,
    /// body and category filled in.
    pub fn event(&self) -> Option<NotificationEvent> {
        let data = match &self.data {
            Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).ok()?,
            Some(value) => value.clone(),
            None => return None,
        };
        if !data.is_object() {
            return None;
        }

        let mut event: NotificationEvent = serde_json::from_value(data).ok()?;
        if event.title.is_empty() {
            event.title = self.title.clone();
        }
        if event.body.is_empty() {
            event.body = self.body.clone();
        }
        event.category = self.notification_type;
        Some(event)
    }
}

fn parse_created_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    notifications: Vec<StoredNotification>,
}

/// Client for the notification inbox endpoints.
pub struct NotificationsApi {
    client: ApiClient,
}

impl NotificationsApi {
    /// Creates an API client for `base_url` authenticated with `auth_token`.
    pub fn new(base_url: &str, auth_token: Option<String>) -> anyhow::Result<Self> {
        Ok(Self::from_client(ApiClient::new(base_url, auth_token)?))
    }

    /// Wraps an existing [`ApiClient`].
    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetches stored notifications, newest first as the backend returns them.
    pub async fn list(&self, unread_only: bool) -> Result<Vec<StoredNotification>, RetrieveError> {
        let path = if unread_only {
            format!("{}?unread_only=true", NOTIFICATIONS_PATH)
        } else {
            NOTIFICATIONS_PATH.to_string()
        };
        let response = self
            .client
            .request::<ListResponse, ()>(Method::GET, &path, None, None)
            .await?;
        let list = ensure_success(response)?.ok_or(RetrieveError::EmptyBody)?;
        log::debug!("Fetched {} stored notifications", list.notifications.len());
        Ok(list.notifications)
    }

    /// Marks one stored notification read.
    pub async fn mark_read(&self, id: i64) -> Result<(), RetrieveError> {
        let path = format!("{}/{}/read", NOTIFICATIONS_PATH, id);
        self.send(Method::POST, &path).await
    }

    /// Marks every stored notification read.
    pub async fn mark_all_read(&self) -> Result<(), RetrieveError> {
        let path = format!("{}/read-all", NOTIFICATIONS_PATH);
        self.send(Method::POST, &path).await
    }

    /// Deletes every stored notification.
    pub async fn clear_all(&self) -> Result<(), RetrieveError> {
        let path = format!("{}/clear", NOTIFICATIONS_PATH);
        self.send(Method::DELETE, &path).await
    }

    async fn send(&self, method: Method, path: &str) -> Result<(), RetrieveError> {
        let response = self.client.request::<Value, ()>(method, path, None, None).await?;
        ensure_success(response).map(|_| ())
    }
}

fn ensure_success<T>(response: ApiResponse<T>) -> Result<Option<T>, RetrieveError> {
    if response.success {
        return Ok(response.data);
    }
    Err(RetrieveError::Status {
        status: response.status,
        detail: error_detail(response.error_body.as_deref()),
    })
}

/// Pulls the human-readable message out of an error body.
fn error_detail(body: Option<&str>) -> String {
    let raw = body.unwrap_or_default().trim();
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(raw) {
        for key in ["detail", "error"] {
            match object.get(key) {
                Some(Value::String(message)) => return message.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    if raw.is_empty() {
        "no details".to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Answers one canned response per connection and records each raw request.
    fn mock_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);

        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let request = read_request(&mut stream);
                record.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        (format!("http://{}", addr), seen)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    const LIST_BODY: &str = r#"{"notifications":[
        {"id":7,"title":"Violation","body":"Unauthorized vehicle in A2","notification_type":"violation_alert",
         "data":"{\"spot\":\"A2\",\"intruder_plate\":\"XYZ-123\"}","is_read":false,"created_at":"2026-01-05T10:00:00.123456"},
        {"id":6,"title":"Payment","body":"Paid","notification_type":"payment","data":null,"is_read":true,
         "created_at":"2026-01-04T09:00:00+00:00"}
    ]}"#;

    #[tokio::test]
    async fn test_list_sends_bearer_token_and_filter() {
        let (base, seen) = mock_server(vec![(200, LIST_BODY)]);
        let api = NotificationsApi::new(&base, Some("tok-1".to_string())).unwrap();

        let rows = api.list(true).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 7);
        assert_eq!(rows[0].notification_type, NotificationCategory::ViolationAlert);
        assert!(rows[1].is_read);

        let requests = seen.lock().unwrap();
        assert!(requests[0].starts_with("GET /api/user/notifications?unread_only=true "));
        assert!(requests[0].to_lowercase().contains("authorization: bearer tok-1"));
    }

    #[tokio::test]
    async fn test_mark_and_clear_hit_their_endpoints() {
        let (base, seen) = mock_server(vec![
            (200, r#"{"success":true}"#),
            (200, ""),
            (200, r#"{"deleted":3}"#),
        ]);
        let api = NotificationsApi::new(&base, Some("tok".to_string())).unwrap();

        api.mark_read(42).await.unwrap();
        api.mark_all_read().await.unwrap();
        api.clear_all().await.unwrap();

        let requests = seen.lock().unwrap();
        assert!(requests[0].starts_with("POST /api/user/notifications/42/read "));
        assert!(requests[1].starts_with("POST /api/user/notifications/read-all "));
        assert!(requests[2].starts_with("DELETE /api/user/notifications/clear "));
    }

    #[tokio::test]
    async fn test_error_status_carries_backend_detail() {
        let (base, _) = mock_server(vec![(404, r#"{"detail":"Notification not found"}"#)]);
        let api = NotificationsApi::new(&base, None).unwrap();

        match api.mark_read(9).await {
            Err(RetrieveError::Status { status, detail }) => {
                assert_eq!(status, 404);
                assert_eq!(detail, "Notification not found");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_detail_fallbacks() {
        assert_eq!(error_detail(Some(r#"{"error":"bad token"}"#)), "bad token");
        assert_eq!(error_detail(Some("gateway says no")), "gateway says no");
        assert_eq!(error_detail(None), "no details");
    }

    #[test]
    fn test_into_logged_decodes_string_data_and_naive_time() {
        let list: ListResponse = serde_json::from_str(LIST_BODY).unwrap();
        let now = Utc::now();
        let mut rows = list.notifications.into_iter();

        let violation = rows.next().unwrap().into_logged(now);
        assert_eq!(violation.server_id, Some(7));
        assert!(!violation.surfaced);
        assert_eq!(violation.created_at.to_rfc3339(), "2026-01-05T10:00:00.123456+00:00");
        let event = violation.event.unwrap();
        assert_eq!(event.subject_key(), "A2-XYZ-123");
        assert_eq!(event.title, "Violation");
        assert_eq!(event.category, NotificationCategory::ViolationAlert);

        let payment = rows.next().unwrap().into_logged(now);
        assert!(payment.read);
        assert!(payment.event.is_none());
        assert_eq!(payment.created_at.to_rfc3339(), "2026-01-04T09:00:00+00:00");
    }

    #[test]
    fn test_unreadable_created_at_falls_back_to_now() {
        let row = StoredNotification {
            id: 1,
            title: "Fine".to_string(),
            body: String::new(),
            notification_type: NotificationCategory::Fine,
            data: Some(Value::String("not json".to_string())),
            is_read: false,
            created_at: Some("yesterday".to_string()),
        };
        let now = Utc::now();
        let logged = row.into_logged(now);
        assert_eq!(logged.created_at, now);
        assert!(logged.event.is_none());
    }
}
