//! Client for the backend's test hooks: provisioning and tearing down
//! throwaway organizations around a test run, plus authenticated calls
//! against the regular API.

use quiesce_core::AutomationError;
use reqwest::{Client, Method, header};
use serde_json::{Value, json};
use tracing::debug;

/// Credentials attached to every hook request.
#[derive(Debug, Clone)]
pub struct HookAuth {
    pub token: String,
    pub csrf: Option<String>,
}

impl HookAuth {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            csrf: None,
        }
    }

    pub fn with_csrf(mut self, csrf: impl Into<String>) -> Self {
        self.csrf = Some(csrf.into());
        self
    }
}

/// One backend to talk to, with optional auth.
pub struct HookSession {
    base_url: String,
    auth: Option<HookAuth>,
    client: Client,
}

impl HookSession {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
            client: Client::new(),
        }
    }

    pub fn with_auth(base_url: impl Into<String>, auth: HookAuth) -> Self {
        Self {
            base_url: base_url.into(),
            auth: Some(auth),
            client: Client::new(),
        }
    }

    /// Swap the credentials, e.g. after `generate` returned a fresh token.
    pub fn set_auth(&mut self, auth: HookAuth) {
        self.auth = Some(auth);
    }

    /// Provision a fresh organization. The response carries whatever the
    /// backend hands back for the new org, typically ids and credentials.
    pub async fn generate(&self, payload: &Value) -> Result<Value, AutomationError> {
        self.send(Method::POST, "testhooks/generate/", Some(payload))
            .await
    }

    /// Mutate the organization's backend state mid-test.
    pub async fn update(&self, payload: &Value) -> Result<Value, AutomationError> {
        self.send(Method::POST, "testhooks/update/", Some(payload))
            .await
    }

    /// Delete the current organization, or a specific one by slug.
    pub async fn teardown(&self, org: Option<&str>) -> Result<Value, AutomationError> {
        self.send(Method::DELETE, &teardown_path(org), None).await
    }

    /// Arbitrary call against the app's API with the session's auth headers.
    /// A GET payload is sent as query parameters, any other method's as a
    /// JSON body.
    pub async fn api_request(
        &self,
        method: Method,
        target: &str,
        payload: Option<&Value>,
    ) -> Result<Value, AutomationError> {
        let path = format!("api/{}", target.trim_start_matches('/'));
        self.send(method, &path, payload).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, AutomationError> {
        let url = self.url_for(path);
        debug!(%method, url, "hook request");
        let response = self
            .request(method, &url, payload)
            .send()
            .await
            .map_err(|e| AutomationError::network_error(format!("Hook request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AutomationError::network_error(format!("Failed to read hook response: {}", e))
        })?;

        if !status.is_success() {
            return Err(AutomationError::hook_error(format!(
                "Hook call to {} returned {}",
                path, status
            ))
            .with_context(json!({ "status": status.as_u16(), "body": body })));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            AutomationError::hook_error(format!("Hook response was not JSON: {}", e))
                .with_context(json!({ "body": body }))
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, url: &str, payload: Option<&Value>) -> reqwest::RequestBuilder {
        let query_payload = method == Method::GET;
        let mut builder = self.client.request(method, url);
        if let Some(auth) = &self.auth {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", auth.token));
            if let Some(csrf) = &auth.csrf {
                builder = builder.header("X-CSRFToken", csrf);
            }
        }
        if let Some(payload) = payload {
            // GET payloads address the query string; other methods carry
            // a JSON body.
            builder = if query_payload {
                builder.query(payload)
            } else {
                builder.json(payload)
            };
        }
        builder
    }
}

fn teardown_path(org: Option<&str>) -> String {
    match org {
        Some(org) => format!("testhooks/org/{org}/"),
        None => "testhooks/org/".to_string(),
    }
}
