use crate::extract::has_timeline_items;
use crate::fetch::build_http_client;
use crate::HarvestError;
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use scraper::Html;
use std::time::Duration;

/// Checks which endpoints currently serve usable content
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns the subset of `endpoints` that passed, in input order
    async fn probe(&self, endpoints: &[String]) -> Vec<String>;
}

/// Probes endpoints over HTTP, all in parallel
///
/// An endpoint passes when a GET of the probe path answers 2xx within the
/// probe timeout and the page carries at least one timeline item.
#[derive(Debug, Clone)]
pub struct HealthProber {
    client: Client,
    probe_path: String,
}

impl HealthProber {
    pub fn new(user_agent: &str, probe_timeout: Duration, probe_path: &str) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(user_agent, probe_timeout)?,
            probe_path: probe_path.to_string(),
        })
    }

    async fn check(&self, endpoint: &str) -> bool {
        let url = format!("{}{}", endpoint, self.probe_path);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Probe of {} failed: {}", endpoint, e);
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Probe of {} returned HTTP {}", endpoint, response.status().as_u16());
            return false;
        }

        match response.text().await {
            Ok(body) => serves_timeline(&body),
            Err(e) => {
                tracing::debug!("Probe of {} returned an unreadable body: {}", endpoint, e);
                false
            }
        }
    }
}

fn serves_timeline(body: &str) -> bool {
    has_timeline_items(&Html::parse_document(body))
}

#[async_trait]
impl Prober for HealthProber {
    async fn probe(&self, endpoints: &[String]) -> Vec<String> {
        let checks = endpoints.iter().map(|endpoint| self.check(endpoint));
        let results = join_all(checks).await;

        let passed: Vec<String> = endpoints
            .iter()
            .zip(results)
            .filter_map(|(endpoint, ok)| ok.then(|| endpoint.clone()))
            .collect();

        tracing::info!("{}/{} endpoints passed the health check", passed.len(), endpoints.len());
        passed
    }
}
