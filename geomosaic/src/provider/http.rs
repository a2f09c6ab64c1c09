//! HTTP client abstraction for testability

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use super::types::ProviderError;

/// Boxed future returned by [`AsyncHttpClient`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// User agent sent with every request. Nominatim rejects anonymous clients.
pub const USER_AGENT: &str = concat!("geomosaic/", env!("CARGO_PKG_VERSION"));

/// Async HTTP operations used by the geodata, geocoding and tile clients.
///
/// Every call carries its own timeout so that different services can be
/// given different patience without building separate clients.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs a GET request and returns the body.
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>>;

    /// Performs a POST with an `application/x-www-form-urlencoded` body.
    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>>;
}

impl<T: AsyncHttpClient + ?Sized> AsyncHttpClient for Arc<T> {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        (**self).get(url, timeout)
    }

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        (**self).post_form(url, form, timeout)
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new client with the default user agent.
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_user_agent(USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ProviderError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read(url: &str, response: Result<reqwest::Response, reqwest::Error>) -> Result<Vec<u8>, ProviderError> {
        let response = response.map_err(|e| map_error(url, e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| map_error(url, e))
    }
}

fn map_error(url: &str, e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(url.to_string())
    } else {
        ProviderError::HttpError(format!("Request failed: {}", e))
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        Box::pin(async move {
            let response = self.client.get(url).timeout(timeout).send().await;
            Self::read(url, response).await
        })
    }

    fn post_form<'a>(
        &'a self,
        url: &'a str,
        form: &'a [(&'a str, &'a str)],
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        Box::pin(async move {
            let response = self.client.post(url).form(form).timeout(timeout).send().await;
            Self::read(url, response).await
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    type Handler = dyn Fn(&str, Option<&str>) -> Result<Vec<u8>, ProviderError> + Send + Sync;
    type Delay = dyn Fn(&str) -> Duration + Send + Sync;

    /// A request seen by [`MockAsyncHttpClient`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct MockRequest {
        pub url: String,
        /// Form fields encoded as `key=value` pairs joined by `&`.
        pub body: Option<String>,
    }

    /// Mock HTTP client for testing.
    ///
    /// Responses come from a handler keyed on URL and form body. An optional
    /// delay makes requests take (virtual) time; a delay at or beyond the
    /// per-call timeout yields [`ProviderError::Timeout`].
    #[derive(Clone)]
    pub struct MockAsyncHttpClient {
        handler: Arc<Handler>,
        delay: Option<Arc<Delay>>,
        requests: Arc<Mutex<Vec<MockRequest>>>,
    }

    impl MockAsyncHttpClient {
        pub fn new(
            handler: impl Fn(&str, Option<&str>) -> Result<Vec<u8>, ProviderError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Arc::new(handler),
                delay: None,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Always answers with the same body.
        pub fn responding(body: impl Into<Vec<u8>>) -> Self {
            let body = body.into();
            Self::new(move |_, _| Ok(body.clone()))
        }

        /// Always fails.
        pub fn failing() -> Self {
            Self::new(|url, _| Err(ProviderError::HttpError(format!("unreachable: {}", url))))
        }

        pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
            self.delay = Some(Arc::new(delay));
            self
        }

        pub fn requests(&self) -> Vec<MockRequest> {
            self.requests.lock().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        async fn respond(&self, url: &str, body: Option<String>, timeout: Duration) -> Result<Vec<u8>, ProviderError> {
            self.requests.lock().push(MockRequest {
                url: url.to_string(),
                body: body.clone(),
            });

            if let Some(delay) = &self.delay {
                let wait = delay(url);
                if wait >= timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(ProviderError::Timeout(url.to_string()));
                }
                tokio::time::sleep(wait).await;
            }

            (self.handler)(url, body.as_deref())
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        fn get<'a>(&'a self, url: &'a str, timeout: Duration) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
            Box::pin(self.respond(url, None, timeout))
        }

        fn post_form<'a>(
            &'a self,
            url: &'a str,
            form: &'a [(&'a str, &'a str)],
            timeout: Duration,
        ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
            let body = form
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            Box::pin(self.respond(url, Some(body), timeout))
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockAsyncHttpClient::responding(vec![1, 2, 3, 4]);

        let result = mock.get("http://example.com", Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_records_form() {
        let mock = MockAsyncHttpClient::responding(Vec::new());

        mock.post_form("http://example.com", &[("data", "q")], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(mock.requests()[0].body.as_deref(), Some("data=q"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_client_timeout() {
        let mock = MockAsyncHttpClient::responding(vec![1]).with_delay(|_| Duration::from_secs(30));

        let result = mock.get("http://slow.example.com", Duration::from_secs(5)).await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(AsyncReqwestClient::new().is_ok());
    }
}
