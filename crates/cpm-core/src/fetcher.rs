//! Client for the Copilot metrics API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::{debug, info};

use cpm_config::Config;
use cpm_types::{MetricRecord, PulseError, Result, Team};

/// Page size used for the teams listing.
const TEAMS_PER_PAGE: usize = 100;

/// Source of raw metrics, implemented over HTTP by [`MetricsClient`].
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// List the organization's teams. A non-200 response is an error.
    async fn list_teams(&self, org: &str) -> Result<Vec<Team>>;

    /// Fetch per-day metrics for the organization (`team == None`) or one
    /// team. A non-200 response means "no data for this scope" and yields
    /// `Ok(None)`.
    async fn fetch_metrics(&self, org: &str, team: Option<&str>)
        -> Result<Option<Vec<MetricRecord>>>;
}

/// HTTP client for the GitHub REST API.
pub struct MetricsClient {
    client: reqwest::Client,
    api_url: String,
}

impl MetricsClient {
    /// Build a client with bearer auth and the pinned API version header.
    pub fn new(config: &Config) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.github_token))
            .map_err(|e| PulseError::Config(format!("Invalid GITHUB_TOKEN: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| PulseError::Config(format!("Invalid GITHUB_API_VERSION: {e}")))?,
        );

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("copilot-pulse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PulseError::Http(format!("Build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    fn metrics_url(&self, org: &str, team: Option<&str>) -> String {
        match team {
            Some(slug) => format!("{}/orgs/{org}/teams/{slug}/copilot/metrics", self.api_url),
            None => format!("{}/orgs/{org}/copilot/metrics", self.api_url),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| PulseError::Http(format!("GET {url}: {e}")))
    }
}

#[async_trait]
impl MetricsSource for MetricsClient {
    async fn list_teams(&self, org: &str) -> Result<Vec<Team>> {
        let mut teams = Vec::new();
        let mut page = 1;

        loop {
            let url = format!(
                "{}/orgs/{org}/teams?per_page={TEAMS_PER_PAGE}&page={page}",
                self.api_url
            );
            let response = self.get(&url).await?;
            if response.status() != StatusCode::OK {
                return Err(PulseError::Fetch {
                    status: response.status().as_u16(),
                    url,
                });
            }

            let batch: Vec<Team> = response
                .json()
                .await
                .map_err(|e| PulseError::Http(format!("Decode teams page {page}: {e}")))?;
            let done = batch.len() < TEAMS_PER_PAGE;
            teams.extend(batch);
            if done {
                break;
            }
            page += 1;
        }

        info!(org, teams = teams.len(), "Listed teams");
        Ok(teams)
    }

    async fn fetch_metrics(
        &self,
        org: &str,
        team: Option<&str>,
    ) -> Result<Option<Vec<MetricRecord>>> {
        let url = self.metrics_url(org, team);
        let response = self.get(&url).await?;

        if response.status() != StatusCode::OK {
            debug!(
                org,
                team = team.unwrap_or("<org>"),
                status = response.status().as_u16(),
                "No metrics for scope"
            );
            return Ok(None);
        }

        let records: Vec<MetricRecord> = response
            .json()
            .await
            .map_err(|e| PulseError::Http(format!("Decode metrics from {url}: {e}")))?;
        debug!(org, team = team.unwrap_or("<org>"), days = records.len(), "Fetched metrics");
        Ok(Some(records))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config(api_url: &str) -> Config {
        Config::from_lookup(|key| match key {
            "GITHUB_TOKEN" => Some("ghp_test".to_string()),
            "ORG_SLUG" => Some("acme".to_string()),
            "GITHUB_API_URL" => Some(api_url.to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn list_teams_sends_auth_and_version_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(header("x-github-api-version", "2022-11-28"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"slug": "core", "name": "Core"},
                {"slug": "web", "name": "Web"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = MetricsClient::new(&config(&server.uri())).unwrap();
        let teams = client.list_teams("acme").await.unwrap();

        let slugs: Vec<&str> = teams.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["core", "web"]);
    }

    #[tokio::test]
    async fn list_teams_follows_pages() {
        let server = MockServer::start().await;
        let full_page: Vec<_> = (0..TEAMS_PER_PAGE)
            .map(|i| json!({"slug": format!("team-{i}")}))
            .collect();

        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(full_page)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"slug": "last"}])))
            .mount(&server)
            .await;

        let client = MetricsClient::new(&config(&server.uri())).unwrap();
        let teams = client.list_teams("acme").await.unwrap();

        assert_eq!(teams.len(), TEAMS_PER_PAGE + 1);
        assert_eq!(teams.last().unwrap().slug, "last");
    }

    #[tokio::test]
    async fn list_teams_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = MetricsClient::new(&config(&server.uri())).unwrap();
        let err = client.list_teams("acme").await.unwrap_err();
        assert!(matches!(err, PulseError::Fetch { status: 403, .. }));
    }

    #[tokio::test]
    async fn fetch_metrics_org_and_team_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/copilot/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"date": "2024-11-01", "total_active_users": 12, "total_engaged_users": 9}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams/core/copilot/metrics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"date": "2024-11-01"}, {"date": "2024-11-02"}
            ])))
            .mount(&server)
            .await;

        let client = MetricsClient::new(&config(&server.uri())).unwrap();

        let org = client.fetch_metrics("acme", None).await.unwrap().unwrap();
        assert_eq!(org.len(), 1);
        assert_eq!(org[0].total_active_users, 12);

        let team = client.fetch_metrics("acme", Some("core")).await.unwrap().unwrap();
        assert_eq!(team.len(), 2);
    }

    #[tokio::test]
    async fn fetch_metrics_non_200_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/acme/teams/tiny/copilot/metrics"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let client = MetricsClient::new(&config(&server.uri())).unwrap();
        let result = client.fetch_metrics("acme", Some("tiny")).await.unwrap();
        assert!(result.is_none());
    }
}
