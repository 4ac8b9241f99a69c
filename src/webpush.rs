//! Web push payload section.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::extract;
use crate::Result;

/// Text direction of a web notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Direction inherited from the document.
    #[serde(rename = "auto")]
    Auto,
    /// Left to right.
    #[serde(rename = "ltr")]
    LeftToRight,
    /// Right to left.
    #[serde(rename = "rtl")]
    RightToLeft,
}

const DIRECTION: [(&str, Direction); 3] = [
    ("AUTO", Direction::Auto),
    ("LEFT_TO_RIGHT", Direction::LeftToRight),
    ("RIGHT_TO_LEFT", Direction::RightToLeft),
];

/// Web-push-specific configuration section.
#[derive(Debug, Clone, Serialize)]
pub struct WebpushConfig {
    /// Web push headers (e.g. `TTL`, `Urgency`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// String key/value data payload for the web target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    /// Web notification sub-object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<WebpushNotification>,
}

/// Web notification sub-object, using the Notification API's field names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebpushNotification {
    /// Body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Tag for notification replacement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Badge icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Language tag.
    #[serde(rename = "lang", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Keep the notification on screen until dismissed.
    #[serde(rename = "requireInteraction", skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    /// Suppress sound and vibration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    /// Re-alert the user when replacing an existing notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renotify: Option<bool>,
    /// Timestamp in milliseconds since the epoch.
    #[serde(rename = "timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp_millis: Option<i64>,
    /// Text direction.
    #[serde(rename = "dir", skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl WebpushConfig {
    /// Build from the message's `webpush` sub-object; absent or empty
    /// contributes nothing.
    pub(crate) fn from_message(message: &Map<String, Value>) -> Result<Option<Self>> {
        let map = match extract::sub_object(message, "webpush")? {
            Some(map) => map,
            None => return Ok(None),
        };
        Ok(Some(Self {
            headers: extract::opt_string_map(map, "headers")?,
            data: extract::opt_string_map(map, "data")?,
            notification: WebpushNotification::from_config(map)?,
        }))
    }
}

impl WebpushNotification {
    fn from_config(config: &Map<String, Value>) -> Result<Option<Self>> {
        let map = match extract::sub_object(config, "notification")? {
            Some(map) => map,
            None => return Ok(None),
        };
        Ok(Some(Self {
            body: extract::opt_text(map, "body")?,
            image: extract::opt_text(map, "image")?,
            icon: extract::opt_text(map, "icon")?,
            tag: extract::opt_text(map, "tag")?,
            badge: extract::opt_text(map, "badge")?,
            language: extract::opt_text(map, "language")?,
            require_interaction: extract::opt_bool(map, "requireInteraction")?,
            silent: extract::opt_bool(map, "silent")?,
            renotify: extract::opt_bool(map, "renotify")?,
            timestamp_millis: extract::opt_i64(map, "timestamp")?,
            direction: extract::opt_enum(map, "direction", &DIRECTION)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(message: Value) -> Option<WebpushConfig> {
        WebpushConfig::from_message(message.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_absent_or_empty_webpush_is_none() {
        assert!(build(json!({})).is_none());
        assert!(build(json!({"webpush": {}})).is_none());
    }

    #[test]
    fn test_headers_and_data() {
        let config = build(json!({"webpush": {
            "headers": {"TTL": 300},
            "data": {"k": "v", "skip": null}
        }}))
        .unwrap();
        assert_eq!(config.headers.unwrap().get("TTL").unwrap(), "300");
        let data = config.data.unwrap();
        assert_eq!(data.get("k").unwrap(), "v");
        assert!(!data.contains_key("skip"));
    }

    #[test]
    fn test_notification_serialization_shape() {
        let config = build(json!({"webpush": {"notification": {
            "body": "B",
            "language": "en-GB",
            "requireInteraction": "true",
            "timestamp": "1700000000000",
            "direction": "left_to_right"
        }}}))
        .unwrap();
        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(
            out,
            json!({"notification": {
                "body": "B",
                "lang": "en-GB",
                "requireInteraction": true,
                "timestamp": 1_700_000_000_000_i64,
                "dir": "ltr"
            }})
        );
    }

    #[test]
    fn test_direction_rejects_unknown_variant() {
        let err = WebpushConfig::from_message(
            json!({"webpush": {"notification": {"direction": "sideways"}}})
                .as_object()
                .unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::DispatchError::UnknownEnumVariant { .. }
        ));
    }
}
