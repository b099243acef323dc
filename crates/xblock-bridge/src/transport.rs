//! Real network transport for the executor.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::COOKIE;
use xblock_protocols::{Fetch, FetchError, HttpMethod, HttpRequest, HttpResponse};

use crate::error::BridgeError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Fetch`] over `reqwest`, sending the session cookie with every request.
pub struct ReqwestFetch {
    client: Client,
    cookie: Option<String>,
}

impl ReqwestFetch {
    pub fn new(cookie: Option<String>) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("xblock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;
        Ok(Self {
            client,
            cookie: cookie.filter(|c| !c.is_empty()),
        })
    }
}

fn map_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;
        Ok(HttpResponse::new(status, body))
    }
}
