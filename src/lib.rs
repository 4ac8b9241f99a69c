//! # FCM Dispatch
//!
//! Turns an untyped, nested message description into a fully-populated
//! Firebase Cloud Messaging v1 send request and dispatches it.
//!
//! ## Features
//!
//! - **Typed payload building**: common, Android, APNs, and web sections
//!   extracted field by field from generic JSON input with defined coercion
//!   rules; absent or empty sub-objects are omitted outright
//! - **Five operations**: `send`, `send-multiple`, `send-to-topic`,
//!   `subscribe`, `unsubscribe`
//! - **Client caching**: one provider client per distinct service-account
//!   credential, initialized at most once under concurrent invocations
//! - **Token lookup**: a `send` with no token resolves one through an
//!   external data API
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fcm_dispatch::DispatchService;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = DispatchService::new()?;
//!
//!     let outcome = service
//!         .invoke(&json!({
//!             "env": { "FCM_SVC_ACC_JSON": "..." },
//!             "args": {
//!                 "action": "send",
//!                 "token": "device-token",
//!                 "message": {
//!                     "notification": { "title": "Hi", "body": "There" },
//!                     "android": { "priority": "high" }
//!                 }
//!             }
//!         }))
//!         .await?;
//!
//!     println!("{}", serde_json::to_string(&outcome)?);
//!     Ok(())
//! }
//! ```

mod android;
mod apns;
mod client;
mod error;
mod extract;
mod message;
mod registry;
mod resolver;
mod router;
mod webpush;

pub use android::{
    AndroidConfig, AndroidFcmOptions, AndroidNotification, AndroidPriority, LightSettings,
    NotificationPriority, Visibility,
};
pub use apns::{Aps, ApnsConfig, ApnsFcmOptions, ApnsPayload};
pub use client::{
    BatchResponse, FcmClient, FcmCredentials, MessagingClient, SendResult, TopicManagementError,
    TopicManagementResponse,
};
pub use error::{DispatchError, Result};
pub use message::{DispatchTarget, Message, MessageDescriptor, Notification};
pub use registry::ClientRegistry;
pub use resolver::{GraphqlTokenResolver, TokenQuery, TokenResolver};
pub use router::{Action, DispatchOutcome, DispatchService, Dispatcher, SUPPORTED_ACTIONS};
pub use webpush::{Direction, WebpushConfig, WebpushNotification};

/// Prelude for common imports.
///
/// ```
/// use fcm_dispatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{BatchResponse, MessagingClient, TopicManagementResponse};
    pub use crate::error::{DispatchError, Result};
    pub use crate::message::{DispatchTarget, Message, MessageDescriptor, Notification};
    pub use crate::registry::ClientRegistry;
    pub use crate::resolver::{TokenQuery, TokenResolver};
    pub use crate::router::{Action, DispatchOutcome, DispatchService, Dispatcher};
}
