//! APNs (iOS) payload section.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::extract;
use crate::Result;

/// iOS-specific configuration section.
#[derive(Debug, Clone, Serialize)]
pub struct ApnsConfig {
    /// Custom APNs headers (e.g. `apns-priority`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// APNs payload carrying the `aps` dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ApnsPayload>,
    /// FCM options for the APNs section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<ApnsFcmOptions>,
}

/// APNs payload wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct ApnsPayload {
    /// The `aps` dictionary.
    pub aps: Aps,
}

/// The APNs `aps` dictionary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aps {
    /// Alert text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    /// Badge count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,
    /// Sound file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Notification category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Background update flag, serialized as `content-available: 1`.
    #[serde(
        rename = "content-available",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_bool_as_int"
    )]
    pub content_available: Option<bool>,
    /// Mutable content flag, serialized as `mutable-content: 1`.
    #[serde(
        rename = "mutable-content",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_bool_as_int"
    )]
    pub mutable_content: Option<bool>,
    /// Thread identifier for notification grouping.
    #[serde(rename = "thread-id", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// FCM options for the APNs section.
#[derive(Debug, Clone, Serialize)]
pub struct ApnsFcmOptions {
    /// Analytics label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ApnsConfig {
    /// Build from the message's `apns` sub-object; absent or empty
    /// contributes nothing.
    pub(crate) fn from_message(message: &Map<String, Value>) -> Result<Option<Self>> {
        let map = match extract::sub_object(message, "apns")? {
            Some(map) => map,
            None => return Ok(None),
        };
        Ok(Some(Self {
            headers: extract::opt_string_map(map, "headers")?,
            payload: match extract::sub_object(map, "payload")? {
                Some(payload) => Some(ApnsPayload {
                    aps: Aps::from_payload(payload)?,
                }),
                None => None,
            },
            fcm_options: match extract::sub_object(map, "fcmOptions")? {
                Some(opts) => Some(ApnsFcmOptions {
                    analytics_label: extract::opt_text(opts, "analyticsLabel")?,
                    image: extract::opt_text(opts, "image")?,
                }),
                None => None,
            },
        }))
    }
}

impl Aps {
    fn from_payload(payload: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            alert: extract::opt_text(payload, "alert")?,
            badge: extract::opt_i64(payload, "badge")?,
            sound: extract::opt_text(payload, "sound")?,
            category: extract::opt_text(payload, "category")?,
            content_available: extract::opt_bool(payload, "contentAvailable")?,
            mutable_content: extract::opt_bool(payload, "mutableContent")?,
            thread_id: extract::opt_text(payload, "threadId")?,
        })
    }
}

fn ser_bool_as_int<S: Serializer>(
    flag: &Option<bool>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match flag {
        Some(b) => serializer.serialize_u8(u8::from(*b)),
        None => serializer.serialize_none(),
    }
}
