//! External token lookup.
//!
//! Used by the `send` path when the caller supplies no token directly: the
//! resolver queries a remote data API for a named entity's token field.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::{DispatchError, Result};

/// One token lookup: which entity to fetch and how to authenticate.
#[derive(Debug, Clone)]
pub struct TokenQuery {
    /// GraphQL endpoint of the data API.
    pub endpoint: String,
    /// Bearer token for the data API.
    pub auth_token: String,
    /// Instance domain header value.
    pub domain: String,
    /// Entity type to fetch.
    pub entity_type: String,
    /// Field holding the device token.
    pub field: String,
    /// Entity id.
    pub id: String,
}

/// Token lookup seam.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Fetch the token field for an entity; `Ok(None)` when not found.
    async fn resolve(&self, query: &TokenQuery) -> Result<Option<String>>;
}

/// Token resolver backed by an authenticated GraphQL data API.
pub struct GraphqlTokenResolver {
    client: Client,
}

impl GraphqlTokenResolver {
    /// Create a resolver with a bounded request timeout.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DispatchError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TokenResolver for GraphqlTokenResolver {
    async fn resolve(&self, query: &TokenQuery) -> Result<Option<String>> {
        let gql = format!(
            "{{\n  get(type: {ty}, id: \"{id}\") {{\n    ... on {ty} {{\n      {field}\n    }}\n  }}\n}}\n",
            ty = query.entity_type,
            id = query.id,
            field = query.field,
        );

        debug!(entity_type = %query.entity_type, id = %query.id, "Resolving device token");
        let response = self
            .client
            .post(&query.endpoint)
            .header("Authorization", &query.auth_token)
            .header("instance-domain", &query.domain)
            .json(&json!({ "variables": {}, "query": gql }))
            .send()
            .await?;

        let body: serde_json::Value = response.json().await?;
        let token = body
            .get("data")
            .and_then(|v| v.get("get"))
            .and_then(|v| v.get(&query.field))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        Ok(token)
    }
}
