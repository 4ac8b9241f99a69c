//! Dispatch routing: action selection, target resolution, provider calls.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::client::{BatchResponse, MessagingClient, TopicManagementResponse};
use crate::extract;
use crate::registry::ClientRegistry;
use crate::resolver::{GraphqlTokenResolver, TokenQuery, TokenResolver};
use crate::{DispatchError, DispatchTarget, MessageDescriptor, Result};

/// Supported action set, rendered for error messages.
pub const SUPPORTED_ACTIONS: &str = "[send,send-multiple,send-to-topic,subscribe,unsubscribe]";

/// The five supported dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send to a single device token.
    Send,
    /// Send to an explicit list of device tokens.
    SendMultiple,
    /// Send to a named topic.
    SendToTopic,
    /// Subscribe a token to a topic.
    Subscribe,
    /// Unsubscribe a token from a topic.
    Unsubscribe,
}

impl Action {
    /// Parse an action name; anything outside the supported set fails fast.
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "send" => Ok(Self::Send),
            "send-multiple" => Ok(Self::SendMultiple),
            "send-to-topic" => Ok(Self::SendToTopic),
            "subscribe" => Ok(Self::Subscribe),
            "unsubscribe" => Ok(Self::Unsubscribe),
            other => Err(DispatchError::UnsupportedAction {
                action: other.to_string(),
                supported: SUPPORTED_ACTIONS,
            }),
        }
    }

    /// Read and parse `args.action` from the invocation input.
    pub fn from_input(input: &Value) -> Result<Self> {
        Self::parse(&extract::required_str(input, "args.action")?)
    }
}

/// Result of one dispatch invocation.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    /// Provider-assigned message id (`send`, `send-to-topic`).
    MessageId(String),
    /// Per-token batch result (`send-multiple`).
    Batch(BatchResponse),
    /// Topic management result (`subscribe`, `unsubscribe`).
    TopicManagement(TopicManagementResponse),
}

/// Routes one invocation to the provider client.
///
/// Both collaborators are injected, so nothing here reaches for ambient
/// global state and tests can substitute either side.
pub struct Dispatcher {
    client: Arc<dyn MessagingClient>,
    resolver: Arc<dyn TokenResolver>,
}

impl Dispatcher {
    /// Create a dispatcher over a provider client and a token resolver.
    pub fn new(client: Arc<dyn MessagingClient>, resolver: Arc<dyn TokenResolver>) -> Self {
        Self { client, resolver }
    }

    /// Parse the action from the input and run it.
    pub async fn dispatch(&self, input: &Value) -> Result<DispatchOutcome> {
        let action = Action::from_input(input)?;
        self.run(action, input).await
    }

    /// Run an already-validated action against the input.
    pub async fn run(&self, action: Action, input: &Value) -> Result<DispatchOutcome> {
        match action {
            Action::Send => {
                let descriptor = message_descriptor(input)?;
                let token = match extract::optional_str(input, "args.token")? {
                    Some(token) => token,
                    None => self.resolve_token(input).await?,
                };
                self.deliver(&descriptor, DispatchTarget::Token(token)).await
            }
            Action::SendMultiple => {
                let descriptor = message_descriptor(input)?;
                let tokens = token_list(input)?;
                self.deliver(&descriptor, DispatchTarget::TokenList(tokens))
                    .await
            }
            Action::SendToTopic => {
                let descriptor = message_descriptor(input)?;
                let topic = extract::required_str(input, "args.topic")?;
                self.deliver(&descriptor, DispatchTarget::Topic(topic)).await
            }
            Action::Subscribe => {
                let topic = extract::required_str(input, "args.topic")?;
                let token = extract::required_str(input, "args.token")?;
                info!(topic = %topic, "Subscribing token to topic");
                let result = self.client.subscribe(&topic, &[token]).await?;
                Ok(DispatchOutcome::TopicManagement(result))
            }
            Action::Unsubscribe => {
                let topic = extract::required_str(input, "args.topic")?;
                let token = extract::required_str(input, "args.token")?;
                info!(topic = %topic, "Unsubscribing token from topic");
                let result = self.client.unsubscribe(&topic, &[token]).await?;
                Ok(DispatchOutcome::TopicManagement(result))
            }
        }
    }

    /// Deliver one descriptor to its resolved target.
    ///
    /// The payload construction is target-agnostic: the multicast arm fans
    /// the same per-token assembly out over the list.
    async fn deliver(
        &self,
        descriptor: &MessageDescriptor,
        target: DispatchTarget,
    ) -> Result<DispatchOutcome> {
        match target {
            DispatchTarget::Token(token) => {
                info!(token = %token, "Sending notification to token");
                let id = self.client.send(&descriptor.to_token_message(token)).await?;
                Ok(DispatchOutcome::MessageId(id))
            }
            DispatchTarget::Topic(topic) => {
                info!(topic = %topic, "Sending notification to topic");
                let id = self.client.send(&descriptor.to_topic_message(topic)).await?;
                Ok(DispatchOutcome::MessageId(id))
            }
            DispatchTarget::TokenList(tokens) => {
                info!(count = tokens.len(), "Sending notification to token list");
                let batch = self.client.send_each(descriptor, &tokens).await;
                Ok(DispatchOutcome::Batch(batch))
            }
        }
    }

    /// Resolve a token through the external lookup when none was supplied.
    ///
    /// A lookup error or an empty result both surface as a dispatch
    /// failure, never as a silent empty send.
    async fn resolve_token(&self, input: &Value) -> Result<String> {
        let query = TokenQuery {
            endpoint: extract::required_str(input, "env.api.url")?,
            auth_token: extract::required_str(input, "env.api.token")?,
            domain: extract::required_str(input, "env.api.domain")?,
            entity_type: extract::required_str(input, "args.token_src_type")?,
            field: extract::required_str(input, "args.token_src_field")?,
            id: extract::required_str(input, "args.token_src_id")?,
        };
        match self.resolver.resolve(&query).await {
            Ok(Some(token)) => Ok(token),
            Ok(None) => Err(DispatchError::TokenResolution(format!(
                "no {} found on {} {}",
                query.field, query.entity_type, query.id
            ))),
            Err(e) => {
                error!(error = %e, "Token lookup failed");
                Err(DispatchError::TokenResolution(e.to_string()))
            }
        }
    }
}

/// The dispatch function entry point.
///
/// Holds the long-lived collaborators (client registry, token resolver) and
/// turns one `{env, args}` invocation into a result or a failure.
pub struct DispatchService {
    registry: ClientRegistry,
    resolver: Arc<dyn TokenResolver>,
}

impl DispatchService {
    /// Create a service with the default GraphQL token resolver.
    pub fn new() -> Result<Self> {
        Ok(Self::with_resolver(Arc::new(GraphqlTokenResolver::new()?)))
    }

    /// Create a service with a custom token resolver.
    pub fn with_resolver(resolver: Arc<dyn TokenResolver>) -> Self {
        Self {
            registry: ClientRegistry::new(),
            resolver,
        }
    }

    /// Handle one invocation.
    ///
    /// The action is validated before credentials are touched, so an
    /// unsupported action never initializes a client or builds a payload.
    pub async fn invoke(&self, input: &Value) -> Result<DispatchOutcome> {
        let action = Action::from_input(input)?;
        let service_account = extract::required_str(input, "env.FCM_SVC_ACC_JSON")?;
        let client = self.registry.get_or_init(&service_account).await?;
        Dispatcher::new(client, self.resolver.clone())
            .run(action, input)
            .await
    }
}

/// Pull `args.message` and build the descriptor. A message supplied as a
/// JSON string is parsed first.
fn message_descriptor(input: &Value) -> Result<MessageDescriptor> {
    let value = extract::lookup(input, "args.message")?
        .ok_or_else(|| DispatchError::missing("args.message"))?;
    match value {
        Value::String(raw) => MessageDescriptor::from_value(&serde_json::from_str(raw)?),
        other => MessageDescriptor::from_value(other),
    }
}

fn token_list(input: &Value) -> Result<Vec<String>> {
    let value = extract::lookup(input, "args.tokens")?
        .ok_or_else(|| DispatchError::missing("args.tokens"))?;
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| extract::as_text("args.tokens", v))
            .collect(),
        other => Err(DispatchError::InvalidType {
            field: "args.tokens".to_string(),
            expected: "array of strings",
            value: other.to_string(),
        }),
    }
}
