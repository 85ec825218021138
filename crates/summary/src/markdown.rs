use depwarden_http::HttpClient;
use serde::Deserialize;

const FOOTER_API: &str = "ui/api/v1/system/auth/screen/footer";

/// Presentation settings shared by every renderer, resolved once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownConfig {
    /// Links and per-leaf decorations. Never changes which entries render.
    pub extended: bool,
    /// Platform root with a trailing slash, or empty.
    pub platform_url: String,
    pub project_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FooterResponse {
    #[serde(rename = "platformId", default)]
    platform_id: String,
}

impl MarkdownConfig {
    pub fn basic() -> Self {
        Self::default()
    }

    pub fn new(extended: bool, platform_url: &str, project_key: Option<String>) -> Self {
        let platform_url = if platform_url.is_empty() || platform_url.ends_with('/') {
            platform_url.to_string()
        } else {
            format!("{platform_url}/")
        };
        Self {
            extended,
            platform_url,
            project_key,
        }
    }

    /// Builds the config, probing the platform for extended-summary support.
    pub async fn probe(
        client: &HttpClient,
        platform_url: &str,
        project_key: Option<String>,
    ) -> Self {
        let config = Self::new(false, platform_url, project_key);
        if config.platform_url.is_empty() {
            return config;
        }
        let extended = probe_extended_summary(client, &config.platform_url).await;
        Self { extended, ..config }
    }

    /// Platform UI link to an artifact path (`<repo>/<dirs>/<file>`).
    pub fn artifact_link(&self, path: &str) -> String {
        let mut url = format!("{}ui/repos/tree/General/{path}", self.platform_url);
        if let Some(project) = &self.project_key {
            url.push_str(&format!("?projectKey={project}"));
        }
        url
    }
}

/// Whether the platform license allows extended summaries. Any failure means
/// no.
pub async fn probe_extended_summary(client: &HttpClient, platform_url: &str) -> bool {
    let url = format!("{platform_url}{FOOTER_API}");
    let response = match client.get(&url).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            log::debug!("Extended summary probe {url} answered {}", response.status);
            return false;
        }
        Err(err) => {
            log::debug!("Extended summary probe failed: {err}");
            return false;
        }
    };
    match response.json::<FooterResponse>() {
        Ok(footer) => footer.platform_id.to_lowercase().contains("enterprise"),
        Err(err) => {
            log::debug!("Unexpected footer response from {url}: {err}");
            false
        }
    }
}

/// The collapsible wrapper every generated summary is written in.
pub fn wrap_details(title: &str, body: &str) -> String {
    format!("<details open><summary> <h4> {title} </h4></summary>{body}</details>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_format() {
        assert_eq!(
            wrap_details("Uploads", "<pre>x</pre>"),
            "<details open><summary> <h4> Uploads </h4></summary><pre>x</pre></details>"
        );
    }

    #[test]
    fn links_carry_project_key() {
        let config = MarkdownConfig::new(true, "https://acme.example", Some("web".into()));
        assert_eq!(
            config.artifact_link("libs/a/b.jar"),
            "https://acme.example/ui/repos/tree/General/libs/a/b.jar?projectKey=web"
        );
    }
}
