use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Write timestamp assigned by the store, never by the client.
///
/// Field order matters: the derived ordering compares seconds first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl ServerTimestamp {
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }
}

impl From<DateTime<Utc>> for ServerTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }
}

/// A stored contact message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub name: String,
    pub email: String,
    pub body: String,
    /// `None` only while a write has not been acknowledged yet.
    pub received_at: Option<ServerTimestamp>,
    /// Historic records may lack the field; absence reads as unread.
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Case-insensitive substring match over name, email and body.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
            || self.body.to_lowercase().contains(needle)
    }
}

/// Fields the client supplies on create. The store adds id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub name: String,
    pub email: String,
    pub body: String,
    pub read: bool,
}

/// Partial update. Only the read flag is mutable after creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl MessagePatch {
    pub fn read(read: bool) -> Self {
        Self { read: Some(read) }
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_none()
    }

    pub fn apply(&self, message: &mut Message) {
        if let Some(read) = self.read {
            message.read = read;
        }
    }
}

/// The visitor-facing contact form. Also the body of the public create route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactForm {
    #[validate(custom(function = "crate::utils::validation::not_blank"))]
    pub name: String,
    #[validate(custom(function = "crate::utils::validation::not_blank"))]
    pub email: String,
    #[validate(custom(function = "crate::utils::validation::not_blank"))]
    pub body: String,
}

impl ContactForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            body: body.into(),
        }
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.email.clear();
        self.body.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.body.is_empty()
    }

    /// Values are stored as typed, not trimmed.
    pub fn to_new_message(&self) -> NewMessage {
        NewMessage {
            name: self.name.clone(),
            email: self.email.clone(),
            body: self.body.clone(),
            read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_read_flag_defaults_to_unread() {
        let raw = r#"{
            "id": "abc",
            "name": "Jo",
            "email": "jo@x.com",
            "body": "Hi",
            "receivedAt": {"seconds": 10, "nanoseconds": 5}
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert!(!msg.read);
        assert_eq!(
            msg.received_at,
            Some(ServerTimestamp { seconds: 10, nanoseconds: 5 })
        );
    }

    #[test]
    fn timestamps_order_by_seconds_then_nanos() {
        let a = ServerTimestamp { seconds: 1, nanoseconds: 999 };
        let b = ServerTimestamp { seconds: 2, nanoseconds: 0 };
        let c = ServerTimestamp { seconds: 2, nanoseconds: 1 };
        assert!(a < b && b < c);
    }

    #[test]
    fn timestamp_round_trips_through_chrono() {
        let now = Utc::now();
        let ts = ServerTimestamp::from(now);
        assert_eq!(ts.to_datetime(), Some(now));
    }

    #[test]
    fn blank_fields_fail_validation() {
        let form = ContactForm::new("Jo", "   ", "Hi");
        assert!(form.validate().is_err());
        let form = ContactForm::new("Jo", "jo@x.com", "Hi");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn patch_only_touches_read() {
        let mut msg = Message {
            id: "1".into(),
            name: "Jo".into(),
            email: "jo@x.com".into(),
            body: "Hi".into(),
            received_at: None,
            read: false,
        };
        MessagePatch::default().apply(&mut msg);
        assert!(!msg.read);
        MessagePatch::read(true).apply(&mut msg);
        assert!(msg.read);
    }
}
