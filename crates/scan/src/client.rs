use crate::model::ScanResponse;
use crate::{Result, ScanError};
use depwarden_graph::GraphNode;
use depwarden_http::HttpClient;
use depwarden_protocol::Settings;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const SCAN_GRAPH_API: &str = "api/v1/scan/graph";

/// What to scan and which policy context applies.
#[derive(Debug, Clone, Default)]
pub struct ScanGraphParams {
    /// Flattened graph (virtual root, one hop).
    pub graph: GraphNode,
    pub project: Option<String>,
    pub watches: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScanStarted {
    #[serde(default)]
    scan_id: String,
}

/// Submits graphs to the scan service and waits for their results.
#[derive(Debug, Clone)]
pub struct ScanGraphClient {
    http: HttpClient,
    xray_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl ScanGraphClient {
    pub fn new(http: HttpClient, xray_url: &str) -> Self {
        let defaults = Settings::default();
        Self {
            http,
            xray_url: if xray_url.ends_with('/') {
                xray_url.to_string()
            } else {
                format!("{xray_url}/")
            },
            poll_interval: defaults.scan_poll_interval(),
            max_polls: defaults.scan_max_polls,
        }
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{path}", self.xray_url);
        Url::parse(&raw).map_err(|err| ScanError::InvalidUrl(format!("{raw}: {err}")))
    }

    fn submit_url(&self, params: &ScanGraphParams) -> Result<String> {
        let mut url = self.api_url(SCAN_GRAPH_API)?;
        if let Some(project) = &params.project {
            url.query_pairs_mut().append_pair("project", project);
        } else if !params.watches.is_empty() {
            let mut query = url.query_pairs_mut();
            for watch in &params.watches {
                query.append_pair("watch", watch);
            }
        }
        Ok(url.into())
    }

    fn results_url(&self, scan_id: &str, with_context: bool) -> Result<String> {
        let mut url = self.api_url(&format!("{SCAN_GRAPH_API}/"))?;
        url.path_segments_mut()
            .map_err(|()| ScanError::InvalidUrl(self.xray_url.clone()))?
            .pop_if_empty()
            .push(scan_id);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("include_vulnerabilities", "true");
            if !with_context {
                query.append_pair("include_licenses", "true");
            }
        }
        Ok(url.into())
    }

    pub async fn submit(&self, params: &ScanGraphParams) -> Result<String> {
        let url = self.submit_url(params)?;
        log::debug!(
            "Submitting {} components for scanning",
            params.graph.nodes.len()
        );
        let response = self.http.post_json(&url, &params.graph).await?;
        if !response.is_success() {
            return Err(ScanError::Rejected {
                url,
                status: response.status,
                body: response.text(),
            });
        }
        let started: ScanStarted = response.json()?;
        if started.scan_id.is_empty() {
            return Err(ScanError::MissingScanId);
        }
        Ok(started.scan_id)
    }

    /// Polls until the scan completes; 202 means still in progress.
    pub async fn results(&self, scan_id: &str, with_context: bool) -> Result<ScanResponse> {
        let url = self.results_url(scan_id, with_context)?;
        for poll in 1..=self.max_polls {
            let response = self.http.get(&url).await?;
            match response.status {
                200 => {
                    let mut results: ScanResponse = response.json()?;
                    if results.scan_id.is_empty() {
                        results.scan_id = scan_id.to_string();
                    }
                    return Ok(results);
                }
                202 => {
                    log::debug!("Scan {scan_id} in progress ({poll}/{})", self.max_polls);
                    tokio::time::sleep(self.poll_interval).await;
                }
                status => {
                    return Err(ScanError::Rejected {
                        url,
                        status,
                        body: response.text(),
                    })
                }
            }
        }
        Err(ScanError::Timeout {
            scan_id: scan_id.to_string(),
            polls: self.max_polls,
        })
    }

    pub async fn scan(&self, params: &ScanGraphParams) -> Result<ScanResponse> {
        let scan_id = self.submit(params).await?;
        let with_context = params.project.is_some() || !params.watches.is_empty();
        self.results(&scan_id, with_context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use depwarden_http::HttpConfig;
    use depwarden_protocol::Credentials;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}/xray/")
    }

    fn client(base: &str) -> ScanGraphClient {
        let http = HttpClient::new(Credentials::Anonymous, HttpConfig::default()).expect("client");
        ScanGraphClient::new(http, base).with_polling(Duration::from_millis(5), 5)
    }

    fn graph() -> GraphNode {
        GraphNode::with_children("root", vec![GraphNode::new("npm://lodash:4.17.20")])
    }

    #[tokio::test]
    async fn polls_until_results_are_ready() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&polls);
        let submitted = Arc::new(Mutex::new(None));
        let body_seen = Arc::clone(&submitted);
        let app = Router::new()
            .route(
                "/xray/api/v1/scan/graph",
                post(move |Json(body): Json<serde_json::Value>| {
                    let body_seen = Arc::clone(&body_seen);
                    async move {
                        *body_seen.lock().unwrap() = Some(body);
                        (StatusCode::CREATED, Json(serde_json::json!({"scan_id": "abc"})))
                    }
                }),
            )
            .route(
                "/xray/api/v1/scan/graph/:id",
                get(
                    move |Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| {
                        let counter = Arc::clone(&counter);
                        async move {
                            assert_eq!(id, "abc");
                            assert_eq!(query["include_vulnerabilities"], "true");
                            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                                return (StatusCode::ACCEPTED, Json(serde_json::json!({})));
                            }
                            (
                                StatusCode::OK,
                                Json(serde_json::json!({
                                    "vulnerabilities": [{"issue_id": "XRAY-1", "severity": "High",
                                        "components": {"npm://lodash:4.17.20": {}}}]
                                })),
                            )
                        }
                    },
                ),
            );
        let base = serve(app).await;

        let response = client(&base)
            .scan(&ScanGraphParams {
                graph: graph(),
                ..ScanGraphParams::default()
            })
            .await
            .unwrap();
        assert_eq!(response.scan_id, "abc");
        assert_eq!(response.vulnerabilities.len(), 1);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        let body = submitted.lock().unwrap().clone().unwrap();
        assert_eq!(body["component_id"], "root");
        assert_eq!(body["nodes"][0]["component_id"], "npm://lodash:4.17.20");
    }

    #[tokio::test]
    async fn endless_progress_times_out() {
        let app = Router::new()
            .route(
                "/xray/api/v1/scan/graph",
                post(|| async { Json(serde_json::json!({"scan_id": "slow"})) }),
            )
            .route(
                "/xray/api/v1/scan/graph/:id",
                get(|| async { StatusCode::ACCEPTED }),
            );
        let base = serve(app).await;
        let err = client(&base)
            .scan(&ScanGraphParams {
                graph: graph(),
                ..ScanGraphParams::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Timeout { polls: 5, .. }));
    }

    #[test]
    fn query_values_are_encoded() {
        let client = client("https://acme.example/xray");
        let with_project = client
            .submit_url(&ScanGraphParams {
                project: Some("a&b #1".into()),
                watches: vec!["ignored".into()],
                ..ScanGraphParams::default()
            })
            .unwrap();
        assert_eq!(
            with_project,
            "https://acme.example/xray/api/v1/scan/graph?project=a%26b+%231"
        );
        let with_watches = client
            .submit_url(&ScanGraphParams {
                watches: vec!["w1".into(), "prod=eu".into()],
                ..ScanGraphParams::default()
            })
            .unwrap();
        assert_eq!(
            with_watches,
            "https://acme.example/xray/api/v1/scan/graph?watch=w1&watch=prod%3Deu"
        );
        assert_eq!(
            client.results_url("id/1", false).unwrap(),
            concat!(
                "https://acme.example/xray/api/v1/scan/graph/id%2F1",
                "?include_vulnerabilities=true&include_licenses=true"
            )
        );
    }

    #[test]
    fn malformed_base_is_reported() {
        let err = client("no scheme").submit_url(&ScanGraphParams::default()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn rejected_submission_keeps_the_body() {
        let app = Router::new().route(
            "/xray/api/v1/scan/graph",
            post(|| async { (StatusCode::BAD_REQUEST, "bad graph") }),
        );
        let base = serve(app).await;
        let err = client(&base)
            .submit(&ScanGraphParams {
                graph: graph(),
                project: Some("web".into()),
                ..ScanGraphParams::default()
            })
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("?project=web"));
        assert!(message.contains("bad graph"));
    }
}
