use crate::{HttpError, Result};
use depwarden_protocol::{Credentials, Settings};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use std::time::Duration;

const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Re-sends after the first attempt.
    pub retries: u32,
    pub head_timeout: Duration,
    pub get_timeout: Duration,
    pub post_timeout: Duration,
    pub retry_backoff: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl HttpConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            retries: settings.retries,
            head_timeout: settings.head_timeout(),
            get_timeout: settings.get_timeout(),
            post_timeout: DEFAULT_POST_TIMEOUT,
            retry_backoff: RETRY_BACKOFF,
        }
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Shared client for every remote call. Cloning is cheap and the client is
/// safe to use from many tasks at once.
///
/// Network errors and 5xx answers are retried; 4xx answers are returned to
/// the caller as-is.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    credentials: Credentials,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(credentials: Credentials, config: HttpConfig) -> Result<Self> {
        let inner = Client::builder()
            .user_agent(concat!("depwarden/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| HttpError::Client(err.to_string()))?;
        Ok(Self {
            inner,
            credentials,
            config,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.send(Method::HEAD, url, None, self.config.head_timeout).await
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.send(Method::GET, url, None, self.config.get_timeout).await
    }

    pub async fn post_json<T: Serialize>(&self, url: &str, body: &T) -> Result<HttpResponse> {
        let payload = serde_json::to_vec(body)?;
        self.send(Method::POST, url, Some(payload), self.config.post_timeout)
            .await
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        timeout: Duration,
    ) -> RequestBuilder {
        let mut builder = self.inner.request(method, url).timeout(timeout);
        builder = match &self.credentials {
            Credentials::Anonymous => builder,
            Credentials::Basic { user, password } => builder.basic_auth(user, Some(password)),
            Credentials::Bearer(token) => builder.bearer_auth(token),
        };
        if let Some(body) = body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }
        builder
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let attempts = self.config.retries.saturating_add(1);
        let method_name = method_name(&method);
        let mut last_status = None;
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            let request = self.request(method.clone(), url, body.as_deref(), timeout);
            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_server_error() {
                        last_status = Some(status);
                        last_reason = format!("server answered {status}");
                    } else {
                        let body = response.bytes().await.map_err(|err| HttpError::Transient {
                            method: method_name,
                            url: url.to_string(),
                            attempts: attempt,
                            status: Some(status),
                            reason: format!("reading body: {err}"),
                        })?;
                        return Ok(HttpResponse {
                            status,
                            body: body.to_vec(),
                        });
                    }
                }
                Err(err) => {
                    last_status = err.status().map(|s| s.as_u16());
                    last_reason = err.to_string();
                }
            }

            if attempt < attempts {
                log::debug!("{method_name} {url} attempt {attempt}/{attempts} failed: {last_reason}");
                tokio::time::sleep(self.config.retry_backoff * attempt).await;
            }
        }

        Err(HttpError::Transient {
            method: method_name,
            url: url.to_string(),
            attempts,
            status: last_status,
            reason: last_reason,
        })
    }
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::HEAD => "HEAD",
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        _ => "REQUEST",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}")
    }

    fn fast_config(retries: u32) -> HttpConfig {
        HttpConfig {
            retries,
            retry_backoff: Duration::from_millis(1),
            ..HttpConfig::default()
        }
    }

    #[tokio::test]
    async fn retries_server_errors_until_success() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/flaky",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        (StatusCode::BAD_GATEWAY, "later")
                    } else {
                        (StatusCode::OK, "ok")
                    }
                }
            }),
        );
        let base = serve(app).await;

        let client = HttpClient::new(Credentials::Anonymous, fast_config(3)).expect("client");
        let response = client.get(&format!("{base}/flaky")).await.expect("get");
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "ok");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn persistent_server_error_is_transient() {
        let app = Router::new().route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let base = serve(app).await;

        let client = HttpClient::new(Credentials::Anonymous, fast_config(2)).expect("client");
        let err = client
            .head(&format!("{base}/down"))
            .await
            .expect_err("must fail");
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn zero_retries_sends_once() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/down",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::BAD_GATEWAY
                }
            }),
        );
        let base = serve(app).await;

        let client = HttpClient::new(Credentials::Anonymous, fast_config(0)).expect("client");
        let err = client.get(&format!("{base}/down")).await.expect_err("must fail");
        assert!(err.to_string().contains("after 1 attempts"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/missing",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }
            }),
        );
        let base = serve(app).await;

        let client = HttpClient::new(Credentials::Anonymous, fast_config(3)).expect("client");
        let response = client.get(&format!("{base}/missing")).await.expect("get");
        assert_eq!(response.status, 404);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let app = Router::new().route(
            "/whoami",
            get(|headers: HeaderMap| async move {
                headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string()
            }),
        );
        let base = serve(app).await;

        let client =
            HttpClient::new(Credentials::Bearer("secret".into()), fast_config(1)).expect("client");
        let response = client.get(&format!("{base}/whoami")).await.expect("get");
        assert_eq!(response.text(), "Bearer secret");
    }
}
