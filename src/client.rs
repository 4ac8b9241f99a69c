//! Messaging provider client: trait seam plus the FCM HTTP implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::{DispatchError, Message, MessageDescriptor, Result};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const IID_ENDPOINT: &str = "https://iid.googleapis.com/iid/v1";

/// Outcome of one send within a multicast batch.
#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    /// Provider-assigned message id, when the send succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Failure reason, when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    fn success(message_id: String) -> Self {
        Self {
            message_id: Some(message_id),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            message_id: None,
            error: Some(error),
        }
    }

    /// Whether this entry represents a successful send.
    pub fn is_success(&self) -> bool {
        self.message_id.is_some()
    }
}

/// Per-token results of a multicast send, in token order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    /// One result per input token, in order.
    pub responses: Vec<SendResult>,
    /// Number of successful sends.
    pub success_count: usize,
    /// Number of failed sends.
    pub failure_count: usize,
}

impl BatchResponse {
    fn new(responses: Vec<SendResult>) -> Self {
        let success_count = responses.iter().filter(|r| r.is_success()).count();
        let failure_count = responses.len() - success_count;
        Self {
            responses,
            success_count,
            failure_count,
        }
    }
}

/// Per-token error within a topic management call.
#[derive(Debug, Clone, Serialize)]
pub struct TopicManagementError {
    /// Index of the failing token in the request.
    pub index: usize,
    /// Provider-reported reason.
    pub reason: String,
}

/// Result of a subscribe or unsubscribe call.
#[derive(Debug, Clone, Serialize)]
pub struct TopicManagementResponse {
    /// Number of tokens handled successfully.
    pub success_count: usize,
    /// Number of tokens that failed.
    pub failure_count: usize,
    /// Details for each failing token.
    pub errors: Vec<TopicManagementError>,
}

impl TopicManagementResponse {
    /// Build from the per-token errors of a topic management call. The
    /// success count never underflows, even on a malformed provider
    /// response reporting more errors than tokens.
    fn from_errors(token_count: usize, errors: Vec<TopicManagementError>) -> Self {
        Self {
            success_count: token_count.saturating_sub(errors.len()),
            failure_count: errors.len(),
            errors,
        }
    }
}

/// Messaging provider client seam.
///
/// The dispatcher only ever talks to this trait, so tests can substitute an
/// in-process client and the HTTP implementation stays swappable.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send one fully-built message, returning the provider message id.
    async fn send(&self, message: &Message) -> Result<String>;

    /// Fan a descriptor out to a token list, one send per token.
    ///
    /// Per-token failures are captured in the batch result; the batch never
    /// aborts early, and the payload construction is the same one used for
    /// single-token sends.
    async fn send_each(&self, descriptor: &MessageDescriptor, tokens: &[String]) -> BatchResponse {
        let mut responses = Vec::with_capacity(tokens.len());
        for token in tokens {
            let message = descriptor.to_token_message(token.clone());
            match self.send(&message).await {
                Ok(id) => responses.push(SendResult::success(id)),
                Err(e) => responses.push(SendResult::failure(e.to_string())),
            }
        }
        BatchResponse::new(responses)
    }

    /// Subscribe tokens to a topic.
    async fn subscribe(&self, topic: &str, tokens: &[String]) -> Result<TopicManagementResponse>;

    /// Unsubscribe tokens from a topic.
    async fn unsubscribe(&self, topic: &str, tokens: &[String])
        -> Result<TopicManagementResponse>;
}

/// Service account credentials for the FCM v1 API.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmCredentials {
    /// GCP project id.
    pub project_id: String,
    /// Client email.
    pub client_email: String,
    /// Private key (PEM format).
    pub private_key: String,
    /// Token URI.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// FCM v1 HTTP client.
#[derive(Debug)]
pub struct FcmClient {
    credentials: FcmCredentials,
    client: Client,
    access_token: RwLock<Option<AccessToken>>,
}

#[derive(Debug)]
struct AccessToken {
    token: String,
    expires_at: Instant,
}

impl FcmClient {
    /// Create a client from a raw service account JSON string.
    ///
    /// No network activity happens here; the OAuth exchange is deferred to
    /// the first send.
    pub fn new(service_account_json: &str) -> Result<Self> {
        let credentials: FcmCredentials = serde_json::from_str(service_account_json)
            .map_err(|e| DispatchError::Config(format!("Invalid service account JSON: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DispatchError::Config(e.to_string()))?;
        Ok(Self {
            credentials,
            client,
            access_token: RwLock::new(None),
        })
    }

    /// Get a cached access token, refreshing when within a minute of expiry.
    async fn get_access_token(&self) -> Result<String> {
        {
            let token = self.access_token.read().unwrap();
            if let Some(t) = token.as_ref() {
                if t.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(t.token.clone());
                }
            }
        }
        self.refresh_token().await
    }

    async fn refresh_token(&self) -> Result<String> {
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        #[derive(Serialize)]
        struct Claims {
            iss: String,
            scope: String,
            aud: String,
            iat: i64,
            exp: i64,
        }

        let claims = Claims {
            iss: self.credentials.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| DispatchError::Config(format!("Invalid private key: {e}")))?;

        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| DispatchError::Config(format!("JWT encoding failed: {e}")))?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let response: TokenResponse = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?
            .json()
            .await?;

        let token = AccessToken {
            token: response.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        };
        *self.access_token.write().unwrap() = Some(token);

        Ok(response.access_token)
    }

    async fn topic_management(
        &self,
        operation: &str,
        topic: &str,
        tokens: &[String],
    ) -> Result<TopicManagementResponse> {
        let access_token = self.get_access_token().await?;

        #[derive(Serialize)]
        struct TopicRequest<'a> {
            to: String,
            registration_tokens: &'a [String],
        }

        let response = self
            .client
            .post(format!("{IID_ENDPOINT}:{operation}"))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("access_token_auth", "true")
            .json(&TopicRequest {
                to: format!("/topics/{topic}"),
                registration_tokens: tokens,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(topic = %topic, status = %status, "Topic management call rejected");
            return Err(provider_error(status.as_u16(), &body));
        }

        #[derive(Deserialize)]
        struct TopicResults {
            #[serde(default)]
            results: Vec<serde_json::Value>,
        }

        let results: TopicResults = response.json().await?;
        let mut errors = Vec::new();
        for (index, entry) in results.results.iter().enumerate() {
            if let Some(reason) = entry.get("error").and_then(|v| v.as_str()) {
                errors.push(TopicManagementError {
                    index,
                    reason: reason.to_string(),
                });
            }
        }
        Ok(TopicManagementResponse::from_errors(tokens.len(), errors))
    }
}

#[async_trait]
impl MessagingClient for FcmClient {
    async fn send(&self, message: &Message) -> Result<String> {
        let access_token = self.get_access_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.credentials.project_id
        );

        #[derive(Serialize)]
        struct SendRequest<'a> {
            message: &'a Message,
        }

        debug!("Sending FCM message");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&SendRequest { message })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            #[derive(Deserialize)]
            struct SendResponse {
                name: String,
            }
            let body: SendResponse = response.json().await?;
            debug!(id = %body.name, "FCM message sent");
            Ok(body.name)
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "FCM send rejected");
            Err(provider_error(status.as_u16(), &body))
        }
    }

    async fn subscribe(&self, topic: &str, tokens: &[String]) -> Result<TopicManagementResponse> {
        self.topic_management("batchAdd", topic, tokens).await
    }

    async fn unsubscribe(
        &self,
        topic: &str,
        tokens: &[String],
    ) -> Result<TopicManagementResponse> {
        self.topic_management("batchRemove", topic, tokens).await
    }
}

/// Map a provider rejection to a `Provider` error, preferring the error
/// status and message from the response body when it parses.
fn provider_error(http_status: u16, body: &str) -> DispatchError {
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(err) = parsed.get("error") {
            let code = match err.get("status").and_then(|v| v.as_str()) {
                Some(status) => status.to_string(),
                None => http_status.to_string(),
            };
            let message = err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or(body)
                .to_string();
            return DispatchError::Provider { code, message };
        }
    }
    DispatchError::Provider {
        code: http_status.to_string(),
        message: body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_parses_fcm_body() {
        let body = r#"{"error": {"status": "UNREGISTERED", "message": "Requested entity was not found."}}"#;
        match provider_error(404, body) {
            DispatchError::Provider { code, message } => {
                assert_eq!(code, "UNREGISTERED");
                assert_eq!(message, "Requested entity was not found.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_provider_error_falls_back_to_http_status() {
        match provider_error(500, "boom") {
            DispatchError::Provider { code, message } => {
                assert_eq!(code, "500");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_batch_response_counts() {
        let batch = BatchResponse::new(vec![
            SendResult::success("projects/p/messages/1".to_string()),
            SendResult::failure("FCM code UNREGISTERED".to_string()),
            SendResult::success("projects/p/messages/2".to_string()),
        ]);
        assert_eq!(batch.success_count, 2);
        assert_eq!(batch.failure_count, 1);
        assert!(batch.responses[0].is_success());
        assert!(!batch.responses[1].is_success());
    }

    #[test]
    fn test_topic_counts_never_underflow() {
        let errors = vec![
            TopicManagementError {
                index: 0,
                reason: "NOT_FOUND".to_string(),
            },
            TopicManagementError {
                index: 1,
                reason: "NOT_FOUND".to_string(),
            },
        ];
        let result = TopicManagementResponse::from_errors(1, errors);
        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 2);

        let result = TopicManagementResponse::from_errors(
            3,
            vec![TopicManagementError {
                index: 2,
                reason: "INVALID_ARGUMENT".to_string(),
            }],
        );
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
    }

    #[test]
    fn test_invalid_service_account_is_config_error() {
        let err = FcmClient::new("not json").unwrap_err();
        assert!(matches!(err, DispatchError::Config(_)));
    }
}
