//! Message descriptor and outbound request assembly.
//!
//! A [`MessageDescriptor`] is the validated, strongly-typed form of one push
//! message: built fresh from the raw input, used once to assemble a
//! provider request, never mutated afterwards. The delivery target is never
//! part of the descriptor; it is attached at assembly time, so the same
//! descriptor builds identical payloads for a token, a topic, or every
//! entry of a multicast list.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::android::AndroidConfig;
use crate::apns::ApnsConfig;
use crate::extract;
use crate::webpush::WebpushConfig;
use crate::{DispatchError, Result};

/// Delivery target for one dispatch. Exactly one variant per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    /// A single device registration token.
    Token(String),
    /// A named broadcast topic.
    Topic(String),
    /// An ordered multicast token list.
    TokenList(Vec<String>),
}

/// Cross-platform notification block.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Notification {
    /// Notification title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Notification body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Notification {
    fn from_message(message: &Map<String, Value>) -> Result<Option<Self>> {
        let map = match extract::sub_object(message, "notification")? {
            Some(map) => map,
            None => return Ok(None),
        };
        Ok(Some(Self {
            title: extract::opt_text(map, "title")?,
            body: extract::opt_text(map, "body")?,
            image: extract::opt_text(map, "image")?,
        }))
    }
}

/// The validated, structured form of one push message.
///
/// Sub-objects that are absent from the input (missing key or empty object)
/// stay `None` and are omitted from the outbound request entirely, so the
/// provider applies its own defaults.
#[derive(Debug, Clone, Default)]
pub struct MessageDescriptor {
    /// Arbitrary string key/value payload.
    pub data: Option<HashMap<String, String>>,
    /// Cross-platform notification block.
    pub notification: Option<Notification>,
    /// Android-specific configuration.
    pub android: Option<AndroidConfig>,
    /// iOS/APNs-specific configuration.
    pub apns: Option<ApnsConfig>,
    /// Web-push-specific configuration.
    pub webpush: Option<WebpushConfig>,
}

impl MessageDescriptor {
    /// Build a descriptor from the raw `message` object.
    ///
    /// Extraction is a single pass per sub-object; no field gets a
    /// builder-side default.
    pub fn from_value(message: &Value) -> Result<Self> {
        let map = message.as_object().ok_or_else(|| DispatchError::InvalidType {
            field: "message".to_string(),
            expected: "object",
            value: message.to_string(),
        })?;
        Ok(Self {
            data: extract::opt_string_map(map, "data")?,
            notification: Notification::from_message(map)?,
            android: AndroidConfig::from_message(map)?,
            apns: ApnsConfig::from_message(map)?,
            webpush: WebpushConfig::from_message(map)?,
        })
    }

    /// Assemble the outbound request for a single token target.
    pub fn to_token_message(&self, token: impl Into<String>) -> Message {
        let mut message = self.assemble();
        message.token = Some(token.into());
        message
    }

    /// Assemble the outbound request for a topic target.
    pub fn to_topic_message(&self, topic: impl Into<String>) -> Message {
        let mut message = self.assemble();
        message.topic = Some(topic.into());
        message
    }

    fn assemble(&self) -> Message {
        Message {
            token: None,
            topic: None,
            data: self.data.clone(),
            notification: self.notification.clone(),
            android: self.android.clone(),
            apns: self.apns.clone(),
            webpush: self.webpush.clone(),
        }
    }
}

/// One fully-populated FCM v1 send request.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Target device token (single sends and multicast fan-out).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Target topic name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// String key/value data payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, String>>,
    /// Cross-platform notification block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    /// Android section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    /// APNs section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
    /// Web push section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<WebpushConfig>,
}
