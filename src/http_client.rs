use anyhow::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
}

/// A very simple version that only holds response data
#[derive(Debug, Clone)]
pub struct SimpleHttpResponse {
    /// HTTP status code
    status_code: u16,
    /// Response body
    body: String,
}

impl SimpleHttpResponse {
    /// Create a new response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status_code: status,
            body: body.into(),
        }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.status_code
    }

    /// Get a reference to the response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Check if successful (2xx status)
    pub fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code < 300
    }
}

/// Trait for HTTP client operations, allowing for mocking
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform HTTP GET request and return a SimpleHttpResponse
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<SimpleHttpResponse>;

    /// Perform HTTP POST request and return a SimpleHttpResponse
    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse>;
}

/// Implementation of HttpClient using reqwest
pub struct ReqwestHttpClient {
    /// Internal reqwest client
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a client with a total request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: HashMap<String, String>) -> Result<SimpleHttpResponse> {
        let mut request = self.client.get(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(SimpleHttpResponse::new(status, body))
    }

    async fn post(
        &self,
        url: &str,
        headers: HashMap<String, String>,
        body: String,
    ) -> Result<SimpleHttpResponse> {
        let mut request = self.client.post(url).body(body);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(SimpleHttpResponse::new(status, body))
    }
}

/// Mock implementation of HttpClient for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// A request seen by the mock
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub url: String,
        pub method: HttpMethod,
        pub headers: HashMap<String, String>,
        pub body: Option<String>,
    }

    #[derive(Debug, Clone)]
    enum MockReply {
        Response(SimpleHttpResponse),
        Failure(String),
    }

    /// A mock HTTP client that returns predefined responses
    #[derive(Default)]
    pub struct MockHttpClient {
        /// Map of URLs to replies
        replies: Mutex<HashMap<String, MockReply>>,
        /// Per-URL artificial latency
        delays: Mutex<HashMap<String, Duration>>,
        /// Record of requests made
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        /// Create a new mock client
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a mock response for a URL
        pub fn mock_response(&self, url: impl Into<String>, status: u16, body: impl Into<String>) {
            let response = SimpleHttpResponse::new(status, body);
            self.replies
                .lock()
                .unwrap()
                .insert(url.into(), MockReply::Response(response));
        }

        /// Mock a successful JSON response (status 200)
        pub fn mock_success_json<T: serde::Serialize>(
            &self,
            url: impl Into<String>,
            data: &T,
        ) -> Result<()> {
            let body = serde_json::to_string(data)?;
            self.mock_response(url, 200, body);
            Ok(())
        }

        /// Make requests to a URL fail at the transport level
        pub fn mock_failure(&self, url: impl Into<String>, message: impl Into<String>) {
            self.replies
                .lock()
                .unwrap()
                .insert(url.into(), MockReply::Failure(message.into()));
        }

        /// Delay replies for a URL
        pub fn mock_delay(&self, url: impl Into<String>, delay: Duration) {
            self.delays.lock().unwrap().insert(url.into(), delay);
        }

        /// Get the list of recorded requests
        pub fn get_requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn record_request(&self, request: RecordedRequest) {
            self.requests.lock().unwrap().push(request);
        }

        async fn reply_for(&self, url: &str) -> Result<SimpleHttpResponse> {
            let delay = self.delays.lock().unwrap().get(url).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let reply = self.replies.lock().unwrap().get(url).cloned();
            match reply {
                Some(MockReply::Response(response)) => Ok(response),
                Some(MockReply::Failure(message)) => Err(anyhow::anyhow!(message)),
                None => Err(anyhow::anyhow!("No mock response configured for URL: {}", url)),
            }
        }
    }

    #[async_trait::async_trait]
    impl HttpClient for MockHttpClient {
        async fn get(
            &self,
            url: &str,
            headers: HashMap<String, String>,
        ) -> Result<SimpleHttpResponse> {
            self.record_request(RecordedRequest {
                url: url.to_string(),
                method: HttpMethod::GET,
                headers,
                body: None,
            });
            self.reply_for(url).await
        }

        async fn post(
            &self,
            url: &str,
            headers: HashMap<String, String>,
            body: String,
        ) -> Result<SimpleHttpResponse> {
            self.record_request(RecordedRequest {
                url: url.to_string(),
                method: HttpMethod::POST,
                headers,
                body: Some(body),
            });
            self.reply_for(url).await
        }
    }
}
