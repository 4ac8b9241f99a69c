//! Android payload section.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::extract;
use crate::{DispatchError, Result};

/// Android message priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AndroidPriority {
    /// Normal priority.
    Normal,
    /// High priority (may wake the device).
    High,
}

const PRIORITY: [(&str, AndroidPriority); 2] = [
    ("NORMAL", AndroidPriority::Normal),
    ("HIGH", AndroidPriority::High),
];

/// Priority of an Android notification once delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationPriority {
    /// Lowest priority.
    #[serde(rename = "PRIORITY_MIN")]
    Min,
    /// Low priority.
    #[serde(rename = "PRIORITY_LOW")]
    Low,
    /// Default priority.
    #[serde(rename = "PRIORITY_DEFAULT")]
    Default,
    /// High priority.
    #[serde(rename = "PRIORITY_HIGH")]
    High,
    /// Maximum priority.
    #[serde(rename = "PRIORITY_MAX")]
    Max,
}

const NOTIFICATION_PRIORITY: [(&str, NotificationPriority); 5] = [
    ("MIN", NotificationPriority::Min),
    ("LOW", NotificationPriority::Low),
    ("DEFAULT", NotificationPriority::Default),
    ("HIGH", NotificationPriority::High),
    ("MAX", NotificationPriority::Max),
];

/// Lock-screen visibility of an Android notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    /// Show on secure lock screens, hiding sensitive content.
    Private,
    /// Show fully on all lock screens.
    Public,
    /// Do not reveal on secure lock screens.
    Secret,
}

const VISIBILITY: [(&str, Visibility); 3] = [
    ("PRIVATE", Visibility::Private),
    ("PUBLIC", Visibility::Public),
    ("SECRET", Visibility::Secret),
];

/// Android-specific configuration section.
#[derive(Debug, Clone, Serialize)]
pub struct AndroidConfig {
    /// Collapse key for message grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
    /// Message priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<AndroidPriority>,
    /// Time to live in milliseconds, serialized as an FCM duration string.
    #[serde(
        rename = "ttl",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_duration"
    )]
    pub ttl_millis: Option<i64>,
    /// Package name restriction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    /// Allow delivery while the device is in direct boot mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_boot_ok: Option<bool>,
    /// Android notification sub-object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidNotification>,
    /// FCM analytics options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcm_options: Option<AndroidFcmOptions>,
}

/// FCM analytics options for the Android section.
#[derive(Debug, Clone, Serialize)]
pub struct AndroidFcmOptions {
    /// Analytics label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
}

/// Android notification sub-object.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AndroidNotification {
    /// Title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Icon resource name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Icon color (#rrggbb).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Sound to play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Tag for notification replacement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Action on notification tap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_action: Option<String>,
    /// Body localization key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_loc_key: Option<String>,
    /// Title localization key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_loc_key: Option<String>,
    /// Notification channel id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Ticker text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Whether the notification persists when clicked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky: Option<bool>,
    /// Event time in milliseconds since the epoch, serialized RFC 3339.
    #[serde(
        rename = "event_time",
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_event_time"
    )]
    pub event_time_millis: Option<i64>,
    /// Local-only notification (not bridged to wearables).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_only: Option<bool>,
    /// Relative priority once delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_priority: Option<NotificationPriority>,
    /// Use the device's default sound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sound: Option<bool>,
    /// Use the device's default vibration pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_vibrate_timings: Option<bool>,
    /// Use the device's default light settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_light_settings: Option<bool>,
    /// Vibration pattern in milliseconds, serialized as duration strings.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_durations"
    )]
    pub vibrate_timings: Option<Vec<i64>>,
    /// Lock-screen visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Number of items this notification represents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_count: Option<i64>,
    /// LED light settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_settings: Option<LightSettings>,
    /// Image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// LED light settings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LightSettings {
    /// On duration in milliseconds, serialized as a duration string.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_duration"
    )]
    pub light_on_duration: Option<i64>,
    /// Off duration in milliseconds, serialized as a duration string.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_duration"
    )]
    pub light_off_duration: Option<i64>,
}

impl AndroidConfig {
    /// Build from the message's `android` sub-object; absent or empty
    /// contributes nothing.
    pub(crate) fn from_message(message: &Map<String, Value>) -> Result<Option<Self>> {
        let map = match extract::sub_object(message, "android")? {
            Some(map) => map,
            None => return Ok(None),
        };
        Ok(Some(Self {
            collapse_key: extract::opt_text(map, "collapseKey")?,
            priority: extract::opt_enum(map, "priority", &PRIORITY)?,
            ttl_millis: opt_duration(map, "ttl")?,
            restricted_package_name: extract::opt_text(map, "restrictedPackageName")?,
            direct_boot_ok: extract::opt_bool(map, "directBootOk")?,
            notification: AndroidNotification::from_config(map)?,
            fcm_options: match extract::sub_object(map, "fcmOptions")? {
                Some(opts) => Some(AndroidFcmOptions {
                    analytics_label: extract::opt_text(opts, "analyticsLabel")?,
                }),
                None => None,
            },
        }))
    }
}

impl AndroidNotification {
    fn from_config(config: &Map<String, Value>) -> Result<Option<Self>> {
        let map = match extract::sub_object(config, "notification")? {
            Some(map) => map,
            None => return Ok(None),
        };
        Ok(Some(Self {
            title: extract::opt_text(map, "title")?,
            body: extract::opt_text(map, "body")?,
            icon: extract::opt_text(map, "icon")?,
            color: extract::opt_text(map, "color")?,
            sound: extract::opt_text(map, "sound")?,
            tag: extract::opt_text(map, "tag")?,
            click_action: extract::opt_text(map, "clickAction")?,
            body_loc_key: extract::opt_text(map, "bodyLocKey")?,
            title_loc_key: extract::opt_text(map, "titleLocKey")?,
            channel_id: extract::opt_text(map, "channelId")?,
            ticker: extract::opt_text(map, "ticker")?,
            sticky: extract::opt_bool(map, "sticky")?,
            event_time_millis: extract::opt_i64(map, "eventTime")?,
            local_only: extract::opt_bool(map, "localOnly")?,
            notification_priority: extract::opt_enum(
                map,
                "notificationPriority",
                &NOTIFICATION_PRIORITY,
            )?,
            default_sound: extract::opt_bool(map, "defaultSound")?,
            default_vibrate_timings: extract::opt_bool(map, "defaultVibrateTimings")?,
            default_light_settings: extract::opt_bool(map, "defaultLightSettings")?,
            vibrate_timings: opt_duration_list(map, "vibrateTimings")?,
            visibility: extract::opt_enum(map, "visibility", &VISIBILITY)?,
            notification_count: extract::opt_i64(map, "notificationCount")?,
            light_settings: Self::light_settings(map)?,
            image: extract::opt_text(map, "image")?,
        }))
    }

    // Only a present-but-empty lightSettings object populates this block,
    // with the durations read from the notification map itself. A non-empty
    // object is ignored.
    fn light_settings(map: &Map<String, Value>) -> Result<Option<LightSettings>> {
        match map.get("lightSettings") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(ls)) if ls.is_empty() => Ok(Some(LightSettings {
                light_on_duration: opt_duration(map, "lightOnDuration")?,
                light_off_duration: opt_duration(map, "lightOffDuration")?,
            })),
            Some(Value::Object(_)) => Ok(None),
            Some(other) => Err(DispatchError::InvalidType {
                field: "lightSettings".to_string(),
                expected: "object",
                value: other.to_string(),
            }),
        }
    }
}

// Durations reach the wire as "Ns" strings; negative input is rejected at
// extraction so the sign can never garble the formatted value.
fn opt_duration(map: &Map<String, Value>, key: &str) -> Result<Option<i64>> {
    match extract::opt_i64(map, key)? {
        Some(ms) if ms < 0 => Err(negative_duration(key, ms)),
        other => Ok(other),
    }
}

fn opt_duration_list(map: &Map<String, Value>, key: &str) -> Result<Option<Vec<i64>>> {
    match extract::opt_i64_list(map, key)? {
        Some(list) => match list.iter().find(|ms| **ms < 0) {
            Some(ms) => Err(negative_duration(key, *ms)),
            None => Ok(Some(list)),
        },
        None => Ok(None),
    }
}

fn negative_duration(field: &str, millis: i64) -> DispatchError {
    DispatchError::InvalidType {
        field: field.to_string(),
        expected: "non-negative duration in milliseconds",
        value: millis.to_string(),
    }
}

/// Format non-negative milliseconds as an FCM duration string, e.g. `"3s"`
/// or `"1.500s"`.
pub(crate) fn duration_str(millis: i64) -> String {
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}.{:03}s", millis / 1000, millis % 1000)
    }
}

fn ser_duration<S: Serializer>(millis: &Option<i64>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match millis {
        Some(ms) => serializer.serialize_str(&duration_str(*ms)),
        None => serializer.serialize_none(),
    }
}

fn ser_durations<S: Serializer>(
    millis: &Option<Vec<i64>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match millis {
        Some(list) => {
            serializer.collect_seq(list.iter().map(|ms| duration_str(*ms)))
        }
        None => serializer.serialize_none(),
    }
}

fn ser_event_time<S: Serializer>(
    millis: &Option<i64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use chrono::{DateTime, SecondsFormat, Utc};
    match millis {
        Some(ms) => {
            let ts = DateTime::<Utc>::from_timestamp_millis(*ms).ok_or_else(|| {
                serde::ser::Error::custom(format!("event time out of range: {ms}"))
            })?;
            serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(message: Value) -> Option<AndroidConfig> {
        AndroidConfig::from_message(message.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_absent_or_empty_android_is_none() {
        assert!(build(json!({})).is_none());
        assert!(build(json!({"android": {}})).is_none());
    }

    #[test]
    fn test_scalar_fields() {
        let config = build(json!({"android": {
            "collapseKey": "ck",
            "priority": "high",
            "ttl": "3600000",
            "restrictedPackageName": "com.example.app",
            "directBootOk": "TRUE"
        }}))
        .unwrap();
        assert_eq!(config.collapse_key.as_deref(), Some("ck"));
        assert_eq!(config.priority, Some(AndroidPriority::High));
        assert_eq!(config.ttl_millis, Some(3_600_000));
        assert_eq!(config.direct_boot_ok, Some(true));
    }

    #[test]
    fn test_priority_rejects_unknown_variant() {
        let err = AndroidConfig::from_message(
            json!({"android": {"priority": "urgent"}}).as_object().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::DispatchError::UnknownEnumVariant { .. }
        ));
    }

    #[test]
    fn test_ttl_serializes_as_duration_string() {
        let config = build(json!({"android": {"ttl": 1500}})).unwrap();
        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out, json!({"ttl": "1.500s"}));
    }

    #[test]
    fn test_notification_enums_and_timings() {
        let config = build(json!({"android": {"notification": {
            "notificationPriority": "high",
            "visibility": "PUBLIC",
            "vibrateTimings": [0, 500, 1000],
            "notificationCount": "4",
            "eventTime": 0
        }}}))
        .unwrap();
        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(
            out["notification"],
            json!({
                "notification_priority": "PRIORITY_HIGH",
                "visibility": "PUBLIC",
                "vibrate_timings": ["0s", "0.500s", "1s"],
                "notification_count": 4,
                "event_time": "1970-01-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_light_settings_only_for_empty_object() {
        // Present-but-empty populates from the parent map.
        let config = build(json!({"android": {"notification": {
            "lightSettings": {},
            "lightOnDuration": 200,
            "lightOffDuration": "300"
        }}}))
        .unwrap();
        let lights = config.notification.unwrap().light_settings.unwrap();
        assert_eq!(lights.light_on_duration, Some(200));
        assert_eq!(lights.light_off_duration, Some(300));

        // A non-empty object is ignored.
        let config = build(json!({"android": {"notification": {
            "lightSettings": {"lightOnDuration": 200},
            "lightOnDuration": 200
        }}}))
        .unwrap();
        assert!(config.notification.unwrap().light_settings.is_none());
    }

    #[test]
    fn test_fcm_options_analytics_label() {
        let config = build(json!({"android": {
            "fcmOptions": {"analyticsLabel": "campaign-1"}
        }}))
        .unwrap();
        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out, json!({"fcm_options": {"analytics_label": "campaign-1"}}));
    }

    #[test]
    fn test_negative_durations_are_rejected() {
        let err = AndroidConfig::from_message(
            json!({"android": {"ttl": "-1500"}}).as_object().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::DispatchError::InvalidType { .. }));

        let err = AndroidConfig::from_message(
            json!({"android": {"notification": {"vibrateTimings": [100, -1]}}})
                .as_object()
                .unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::DispatchError::InvalidType { .. }));

        let err = AndroidConfig::from_message(
            json!({"android": {"notification": {
                "lightSettings": {},
                "lightOnDuration": -200
            }}})
            .as_object()
            .unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, crate::DispatchError::InvalidType { .. }));
    }

    #[test]
    fn test_duration_str() {
        assert_eq!(duration_str(0), "0s");
        assert_eq!(duration_str(3000), "3s");
        assert_eq!(duration_str(1500), "1.500s");
        assert_eq!(duration_str(5), "0.005s");
    }
}
