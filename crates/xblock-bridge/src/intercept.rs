//! Hooks around the page's own network APIs.
//!
//! Every request the page issues passes through these wrappers, which hand
//! the headers to the [`CredentialStore`] before delegating unchanged.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use xblock_protocols::{Fetch, FetchError, HttpMethod, HttpRequest, HttpResponse};

use crate::credentials::CredentialStore;

/// The page's fetch-like API with credential capture in front of it.
pub struct InterceptingFetch {
    inner: Arc<dyn Fetch>,
    credentials: Arc<CredentialStore>,
}

impl InterceptingFetch {
    pub fn new(inner: Arc<dyn Fetch>, credentials: Arc<CredentialStore>) -> Self {
        Self { inner, credentials }
    }
}

#[async_trait]
impl Fetch for InterceptingFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.credentials.observe(&request.url, &request.headers);
        self.inner.fetch(request).await
    }
}

/// The page's XHR-like API: `open`, any number of `set_request_header`, `send`.
pub struct XhrRequest {
    inner: Arc<dyn Fetch>,
    credentials: Arc<CredentialStore>,
    method: HttpMethod,
    url: Option<String>,
    headers: BTreeMap<String, String>,
}

impl XhrRequest {
    pub fn new(inner: Arc<dyn Fetch>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            inner,
            credentials,
            method: HttpMethod::Get,
            url: None,
            headers: BTreeMap::new(),
        }
    }

    /// Starts a request, discarding headers set for a previous one.
    pub fn open(&mut self, method: HttpMethod, url: impl Into<String>) {
        self.method = method;
        self.url = Some(url.into());
        self.headers.clear();
    }

    pub fn set_request_header(&mut self, name: &str, value: &str) {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub async fn send(&mut self, body: Option<String>) -> Result<HttpResponse, FetchError> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| FetchError::Network("send() called before open()".to_string()))?;
        self.credentials.observe(&url, &self.headers);

        let request = HttpRequest {
            method: self.method,
            url,
            headers: self.headers.clone(),
            body,
        };
        self.inner.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialPair;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl Fetch for Recorder {
        async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
            self.seen.lock().push(request);
            Ok(HttpResponse::new(200, "{}"))
        }
    }

    #[tokio::test]
    async fn test_fetch_hook_captures_and_delegates() {
        let recorder = Arc::new(Recorder::default());
        let credentials = Arc::new(CredentialStore::new("/i/api/"));
        let fetch = InterceptingFetch::new(recorder.clone(), credentials.clone());

        let request = HttpRequest::get("https://x.com/i/api/graphql/q")
            .with_header("Authorization", "Bearer page")
            .with_header("X-Csrf-Token", "c0");
        fetch.fetch(request).await.unwrap();

        assert_eq!(recorder.seen.lock().len(), 1);
        assert_eq!(credentials.captured(), Some(CredentialPair::new("Bearer page", "c0")));
    }

    #[tokio::test]
    async fn test_xhr_hook_lowercases_header_names() {
        let recorder = Arc::new(Recorder::default());
        let credentials = Arc::new(CredentialStore::new("/i/api/"));
        let mut xhr = XhrRequest::new(recorder.clone(), credentials.clone());

        xhr.open(HttpMethod::Post, "https://x.com/i/api/1.1/jot.json");
        xhr.set_request_header("AUTHORIZATION", "Bearer xhr");
        xhr.set_request_header("X-CSRF-Token", "c9");
        xhr.send(Some("a=b".into())).await.unwrap();

        assert_eq!(credentials.captured(), Some(CredentialPair::new("Bearer xhr", "c9")));
        assert_eq!(recorder.seen.lock()[0].body.as_deref(), Some("a=b"));
    }

    #[tokio::test]
    async fn test_xhr_reopen_clears_headers() {
        let recorder = Arc::new(Recorder::default());
        let credentials = Arc::new(CredentialStore::new("/i/api/"));
        let mut xhr = XhrRequest::new(recorder, credentials.clone());

        xhr.open(HttpMethod::Get, "https://x.com/other");
        xhr.set_request_header("authorization", "Bearer x");
        xhr.open(HttpMethod::Get, "https://x.com/i/api/y");
        xhr.set_request_header("x-csrf-token", "c");
        xhr.send(None).await.unwrap();

        assert_eq!(credentials.captured(), None);
    }

    #[tokio::test]
    async fn test_xhr_send_without_open_fails() {
        let recorder = Arc::new(Recorder::default());
        let credentials = Arc::new(CredentialStore::new("/i/api/"));
        let mut xhr = XhrRequest::new(recorder, credentials);
        assert!(xhr.send(None).await.is_err());
    }
}
