//! The privileged action executor.
//!
//! Runs in the page's own context. Performs the four relationship actions and
//! the relationship check with the page's credentials, retrying once when an
//! authorization rejection coincides with a rotated anti-forgery cookie.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use url::form_urlencoded;
use xblock_config::PlatformConfig;
use xblock_protocols::{
    ActionErrorCode, ActionFailure, ActionKind, ActionOutcome, BridgeMessage, CookieSource, Fetch,
    HttpRequest, HttpResponse, Identifier, Messages, ResultPayload,
};

use crate::credentials::{CredentialPair, CredentialStore};

/// Where the executor sends requests and how it derives credentials.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub base_url: String,
    pub api_prefix: String,
    /// Percent-encoded public bearer token.
    pub public_bearer: String,
    pub csrf_cookie: String,
}

impl ExecutorSettings {
    pub fn from_platform(platform: &PlatformConfig) -> Self {
        Self {
            base_url: platform.base_url.trim_end_matches('/').to_string(),
            api_prefix: platform.api_prefix.clone(),
            public_bearer: platform.public_bearer.clone(),
            csrf_cookie: platform.csrf_cookie.clone(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}1.1/{}", self.base_url, self.api_prefix, path)
    }

    pub fn endpoint(&self, action: ActionKind) -> String {
        self.api_url(match action {
            ActionKind::Block => "blocks/create.json",
            ActionKind::Unblock => "blocks/destroy.json",
            ActionKind::Mute => "mutes/users/create.json",
            ActionKind::Unmute => "mutes/users/destroy.json",
        })
    }

    pub fn relationship_url(&self, target: &Identifier) -> String {
        let encoded: String = form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        format!(
            "{}?source_screen_name=&target_screen_name={}",
            self.api_url("friendships/show.json"),
            encoded
        )
    }

    /// `Bearer <token>` with the token percent-decoded.
    fn derived_authorization(&self) -> Option<String> {
        if self.public_bearer.is_empty() {
            return None;
        }
        let decoded = form_urlencoded::parse(self.public_bearer.as_bytes())
            .next()
            .map(|(token, _)| token.into_owned())?;
        Some(format!("Bearer {decoded}"))
    }
}

pub struct ActionExecutor {
    fetch: Arc<dyn Fetch>,
    credentials: Arc<CredentialStore>,
    cookies: Arc<dyn CookieSource>,
    settings: ExecutorSettings,
    messages: Messages,
}

impl ActionExecutor {
    /// `fetch` must be the page's original, un-intercepted capability so the
    /// executor's own calls are never mistaken for page traffic.
    pub fn new(
        fetch: Arc<dyn Fetch>,
        credentials: Arc<CredentialStore>,
        cookies: Arc<dyn CookieSource>,
        settings: ExecutorSettings,
        messages: Messages,
    ) -> Self {
        Self {
            fetch,
            credentials,
            cookies,
            settings,
            messages,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    fn csrf_cookie(&self) -> Option<String> {
        self.cookies.cookie(&self.settings.csrf_cookie)
    }

    /// The captured pair, else the public token plus the current cookie.
    pub fn current_credentials(&self) -> Option<CredentialPair> {
        if let Some(pair) = self.credentials.captured() {
            return Some(pair);
        }
        let csrf = self.csrf_cookie()?;
        let authorization = self.settings.derived_authorization()?;
        Some(CredentialPair::new(authorization, csrf))
    }

    fn failure(&self, code: ActionErrorCode, detail: &str) -> ActionFailure {
        ActionFailure::new(code, self.messages.error(code, detail))
    }

    fn action_request(&self, url: &str, target: &Identifier, pair: &CredentialPair) -> HttpRequest {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("screen_name", target.as_str())
            .finish();
        HttpRequest::post(url, body)
            .with_header("authorization", pair.authorization.clone())
            .with_header("x-csrf-token", pair.csrf_token.clone())
            .with_header("content-type", "application/x-www-form-urlencoded")
    }

    fn decode(response: &HttpResponse) -> ActionOutcome {
        response
            .json::<Value>()
            .map_err(|e| ActionFailure::new(ActionErrorCode::Network, e.to_string()))
    }

    /// Performs `action` (a raw verb, so unknown verbs can be reported) on `target`.
    pub async fn perform(&self, action: &str, target: &Identifier) -> ActionOutcome {
        let Some(pair) = self.current_credentials() else {
            warn!(action, "No credentials available");
            return Err(self.failure(ActionErrorCode::NoAuth, ""));
        };

        let kind: ActionKind = match action.parse() {
            Ok(kind) => kind,
            Err(code) => return Err(self.failure(code, action)),
        };

        info!(%kind, %target, "Performing action");
        let url = self.settings.endpoint(kind);

        let response = match self.fetch.fetch(self.action_request(&url, target, &pair)).await {
            Ok(response) => response,
            Err(e) => return Err(ActionFailure::new(ActionErrorCode::Network, e.to_string())),
        };

        if response.is_success() {
            return Self::decode(&response);
        }

        match response.status {
            403 => self.retry_with_fresh_csrf(&url, target, &pair).await,
            429 => {
                warn!(%kind, %target, "Rate limited");
                Err(self.failure(ActionErrorCode::RateLimited, ""))
            }
            status => {
                warn!(%kind, %target, status, "Action rejected");
                Err(ActionFailure::new(ActionErrorCode::Http(status), response.body))
            }
        }
    }

    async fn retry_with_fresh_csrf(
        &self,
        url: &str,
        target: &Identifier,
        used: &CredentialPair,
    ) -> ActionOutcome {
        let forbidden = || self.failure(ActionErrorCode::Forbidden, "");

        let Some(fresh) = self.csrf_cookie().filter(|fresh| *fresh != used.csrf_token) else {
            warn!(%target, "Authorization rejected and no fresh anti-forgery token");
            return Err(forbidden());
        };

        info!(%target, "Retrying with refreshed anti-forgery token");
        let refreshed = used.with_csrf(fresh);
        let response = self
            .fetch
            .fetch(self.action_request(url, target, &refreshed))
            .await
            .map_err(|e| ActionFailure::new(ActionErrorCode::Network, e.to_string()))?;

        if !response.is_success() {
            warn!(%target, status = response.status, "Retry rejected");
            return Err(forbidden());
        }
        self.credentials.replace(refreshed);
        Self::decode(&response)
    }

    /// Whether the session follows `target`. Every failure reads as `false`.
    pub async fn check_following(&self, target: &Identifier) -> bool {
        let Some(pair) = self.current_credentials() else {
            return false;
        };

        let request = HttpRequest::get(self.settings.relationship_url(target))
            .with_header("authorization", pair.authorization)
            .with_header("x-csrf-token", pair.csrf_token);

        match self.fetch.fetch(request).await {
            Ok(response) if response.is_success() => response
                .json::<Value>()
                .ok()
                .and_then(|data| data.pointer("/relationship/source/following").and_then(Value::as_bool))
                .unwrap_or(false),
            Ok(response) => {
                debug!(%target, status = response.status, "Relationship check rejected");
                false
            }
            Err(e) => {
                debug!(%target, error = %e, "Relationship check failed");
                false
            }
        }
    }

    /// Answers one request message. Other variants yield `None`.
    pub async fn handle(&self, message: BridgeMessage) -> Option<BridgeMessage> {
        match message {
            BridgeMessage::Action {
                request_id,
                action,
                screen_name,
            } => {
                let outcome = self.perform(&action, &screen_name).await;
                Some(BridgeMessage::result(
                    request_id,
                    ResultPayload::from_outcome(outcome),
                ))
            }
            BridgeMessage::CheckFollowing {
                request_id,
                screen_name,
            } => {
                let following = self.check_following(&screen_name).await;
                Some(BridgeMessage::result(
                    request_id,
                    ResultPayload::relationship(following),
                ))
            }
            BridgeMessage::Result { .. } | BridgeMessage::Ready => None,
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
