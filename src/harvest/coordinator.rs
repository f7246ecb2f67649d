//! Harvester - the public entry point for every retrieval operation
//!
//! Builds the federation (discovery or configured instances, then an
//! initial health probe) once, and hands every operation its own
//! orchestrator over a snapshot of the working set.

use crate::config::Config;
use crate::extract::{extract_profile, main_post, MediaEncoding, Profile, Record};
use crate::federation::{discover, EndpointPool, HealthProber, Prober};
use crate::fetch::{
    build_http_client, FetchOutcome, HttpSessionFactory, Orchestrator, RetryPolicy, RetryState,
    SessionFactory, SessionSettings,
};
use crate::harvest::collector::Collector;
use crate::harvest::dispatch::{dispatch, DispatchLimits, TaskOutcome};
use crate::harvest::query::{normalize_username, Query, QueryPlan};
use crate::harvest::result::{CollectionResult, Termination};
use crate::{HarvestError, QueryResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scraper::Html;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point for collections and lookups
#[derive(Clone)]
pub struct Harvester {
    pool: EndpointPool,
    sessions: Arc<dyn SessionFactory>,
    prober: Arc<dyn Prober>,
    policy: RetryPolicy,
    max_retries: u32,
    limits: DispatchLimits,
    seed: Option<u64>,
}

impl Harvester {
    /// Builds the federation described by `config`
    ///
    /// # Errors
    ///
    /// Fails if discovery fails or the HTTP clients cannot be built. An empty
    /// working set is not an error here; operations report it instead.
    pub async fn connect(config: &Config) -> Result<Self, HarvestError> {
        let settings = SessionSettings::from_config(config);
        let federation = &config.federation;

        let candidates = if federation.instances.is_empty() {
            let client = build_http_client(&settings.user_agent, settings.request_timeout)?;
            discover(&client, &federation.directory_url).await?
        } else {
            tracing::info!("Using {} configured endpoints", federation.instances.len());
            federation.instances.clone()
        };

        let health_checked = !federation.skip_instance_check;
        let mut pool = EndpointPool::new(candidates, health_checked);
        let prober = HealthProber::new(&settings.user_agent, settings.probe_timeout, &federation.probe_path)?;

        if health_checked {
            let passed = prober.probe(pool.candidates()).await;
            pool.replace_working(&passed);
            if pool.is_empty() {
                tracing::warn!("No endpoint passed the initial health check");
            }
        } else {
            tracing::info!("Health checking disabled; all {} candidates are working", pool.candidates().len());
        }

        Ok(Self::from_parts(
            pool,
            Arc::new(HttpSessionFactory::new(settings)),
            Arc::new(prober),
            config,
        ))
    }

    /// Assembles a harvester from an existing pool and collaborators
    pub fn from_parts(
        pool: EndpointPool,
        sessions: Arc<dyn SessionFactory>,
        prober: Arc<dyn Prober>,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            sessions,
            prober,
            policy: RetryPolicy::from_config(&config.fetch),
            max_retries: config.fetch.max_retries,
            limits: DispatchLimits::from_config(&config.dispatch),
            seed: config.federation.seed,
        }
    }

    /// Replaces the retry policy, e.g. to remove delays
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cancels dispatched operations when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.limits.cancel = token;
        self
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    /// Upper bound on queries per batch
    pub fn max_parallel(&self) -> usize {
        self.limits.max_parallel
    }

    /// Collects one query
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid query, or when health checking is
    /// disabled and no endpoint is configured. Fetch failures are reported
    /// through [`CollectionResult::termination`].
    pub async fn posts(&self, query: &Query) -> Result<CollectionResult, HarvestError> {
        let plan = query.plan()?;
        self.run(0, query.clone(), plan).await
    }

    /// Collects several queries in parallel, one operation per query
    ///
    /// Every query is validated before anything is dispatched.
    pub async fn posts_many(&self, queries: Vec<Query>) -> Result<Vec<CollectionResult>, HarvestError> {
        let plans = queries.iter().map(Query::plan).collect::<QueryResult<Vec<_>>>()?;
        let inputs: Vec<(Query, QueryPlan)> = queries.into_iter().zip(plans).collect();

        let harvester = self.clone();
        let outcomes = dispatch(inputs, &self.limits, move |index, (query, plan)| {
            let harvester = harvester.clone();
            async move { harvester.run(index, query, plan).await }
        })
        .await?;

        outcomes
            .into_iter()
            .map(|outcome| match outcome {
                TaskOutcome::Completed(result) => result,
                TaskOutcome::TimedOut | TaskOutcome::Cancelled | TaskOutcome::Failed(_) => {
                    Ok(CollectionResult::terminated(Termination::Cancelled))
                }
            })
            .collect()
    }

    /// Fetches a user's profile card
    ///
    /// Returns `Ok(None)` when the profile could not be retrieved.
    pub async fn profile(&self, username: &str, instance: Option<&str>) -> Result<Option<Profile>, HarvestError> {
        let username = normalize_username(username)?;
        self.lookup_profile(0, username, instance.map(str::to_string)).await
    }

    /// Fetches several profile cards in parallel
    pub async fn profiles(
        &self,
        usernames: Vec<String>,
        instance: Option<String>,
    ) -> Result<Vec<Option<Profile>>, HarvestError> {
        let usernames = usernames
            .iter()
            .map(|username| normalize_username(username))
            .collect::<QueryResult<Vec<_>>>()?;

        let harvester = self.clone();
        let outcomes = dispatch(usernames, &self.limits, move |index, username| {
            let harvester = harvester.clone();
            let instance = instance.clone();
            async move { harvester.lookup_profile(index, username, instance).await }
        })
        .await?;

        outcomes
            .into_iter()
            .map(|outcome| match outcome {
                TaskOutcome::Completed(profile) => profile,
                _ => Ok(None),
            })
            .collect()
    }

    /// Fetches a single post by author and id
    pub async fn post_by_id(
        &self,
        username: &str,
        id: &str,
        instance: Option<&str>,
    ) -> Result<Option<Record>, HarvestError> {
        let username = normalize_username(username)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(crate::QueryError::EmptyTerm.into());
        }

        let path = format!("/{}/status/{}", username, id);
        let Some(body) = self.fetch_single(0, &path, instance).await? else {
            return Ok(None);
        };
        Ok(parse_post(&body))
    }

    async fn run(&self, index: usize, query: Query, plan: QueryPlan) -> Result<CollectionResult, HarvestError> {
        let mut orchestrator = self.orchestrator(index);
        if !self.bind(&mut orchestrator, query.instance.as_deref())? {
            return Ok(CollectionResult::terminated(Termination::FederationDown));
        }

        tracing::info!("Collecting {} '{}' via {}", query.mode, query.term, plan.initial_path);
        let max_retries = query.max_retries.unwrap_or(self.max_retries);
        let result = Collector::new(orchestrator, max_retries).collect_plan(&plan).await;

        tracing::info!(
            "'{}': {} records, {} threads ({})",
            query.term,
            result.records.len(),
            result.threads.len(),
            result.termination
        );
        Ok(result)
    }

    async fn lookup_profile(
        &self,
        index: usize,
        username: String,
        instance: Option<String>,
    ) -> Result<Option<Profile>, HarvestError> {
        let path = format!("/{}", username);
        let Some(body) = self.fetch_single(index, &path, instance.as_deref()).await? else {
            return Ok(None);
        };
        Ok(parse_profile(&body))
    }

    /// Fetches one page through a fresh orchestrator
    async fn fetch_single(
        &self,
        index: usize,
        path: &str,
        instance: Option<&str>,
    ) -> Result<Option<String>, HarvestError> {
        let mut orchestrator = self.orchestrator(index);
        if !self.bind(&mut orchestrator, instance)? {
            return Ok(None);
        }

        let mut state = RetryState::new();
        match orchestrator.fetch_page(path, self.max_retries, &mut state).await {
            FetchOutcome::Page(page) => Ok(Some(page.body)),
            other => {
                tracing::warn!("No page for {}: {:?}", path, other);
                Ok(None)
            }
        }
    }

    fn orchestrator(&self, index: usize) -> Orchestrator {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_os_rng(),
        };
        Orchestrator::new(
            self.pool.clone(),
            self.sessions.clone(),
            self.prober.clone(),
            self.policy.clone(),
            rng,
        )
    }

    /// Binds the orchestrator's first session
    ///
    /// Returns `Ok(false)` when health checking left no working endpoint.
    fn bind(&self, orchestrator: &mut Orchestrator, instance: Option<&str>) -> Result<bool, HarvestError> {
        match orchestrator.bind(instance) {
            Ok(()) => Ok(true),
            Err(e) if self.pool.is_health_checked() => {
                tracing::warn!("{}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_profile(body: &str) -> Option<Profile> {
    let document = Html::parse_document(body);
    extract_profile(&document, MediaEncoding::detect(&document))
}

fn parse_post(body: &str) -> Option<Record> {
    let document = Html::parse_document(body);
    main_post(&document, MediaEncoding::detect(&document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::scripted::{item_page, ok, ScriptedSessions, StaticProber};
    use crate::fetch::RawResponse;
    use crate::harvest::query::SearchMode;

    const A: &str = "https://a.example";
    const B: &str = "https://b.example";

    fn config() -> Config {
        let mut config = Config::default();
        config.federation.seed = Some(3);
        config
    }

    fn harvester(endpoints: &[&str], health_checked: bool, sessions: &ScriptedSessions) -> Harvester {
        Harvester::from_parts(
            EndpointPool::new(endpoints.iter().copied(), health_checked),
            Arc::new(sessions.clone()),
            StaticProber::passing(endpoints),
            &config(),
        )
        .with_policy(RetryPolicy::immediate())
    }

    #[tokio::test]
    async fn test_date_window_scenario_across_degraded_endpoint() {
        let sessions = ScriptedSessions::new(|endpoint, _| {
            if endpoint == A {
                ok("<html><body><div class=\"timeline\"></div></body></html>")
            } else {
                ok(&item_page(&[("timeline-item", 1), ("timeline-item", 2)], None))
            }
        });
        let harvester = harvester(&[A, B], false, &sessions);

        let query = Query::new("acct1", SearchMode::User)
            .with_number(1)
            .with_since("2023-01-01")
            .with_until("2023-01-31");
        let result = harvester.posts(&query).await.unwrap();

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.termination, Termination::CursorExhausted);
        assert!(sessions
            .paths()
            .iter()
            .all(|path| path == "/acct1/search?f=tweets&q=&since=2023-01-01&until=2023-01-31"));
    }

    #[tokio::test]
    async fn test_no_endpoint_without_health_checks_is_error() {
        let sessions = ScriptedSessions::new(|_, _| ok(""));
        let harvester = harvester(&[], false, &sessions);

        let result = harvester.posts(&Query::new("rust", SearchMode::Term)).await;
        assert!(matches!(result, Err(HarvestError::NoEndpoint(_))));
    }

    #[tokio::test]
    async fn test_empty_working_set_is_federation_down() {
        let sessions = ScriptedSessions::new(|_, _| ok(""));
        let harvester = harvester(&[], true, &sessions);

        let result = harvester.posts(&Query::new("rust", SearchMode::Term)).await.unwrap();
        assert_eq!(result.termination, Termination::FederationDown);
    }

    #[tokio::test]
    async fn test_posts_many_validates_everything_first() {
        let sessions = ScriptedSessions::new(|_, _| ok(""));
        let harvester = harvester(&[A], false, &sessions);

        let queries = vec![
            Query::new("rust", SearchMode::Term),
            Query::new("rust", SearchMode::Term).with_since("yesterday"),
        ];
        assert!(matches!(
            harvester.posts_many(queries).await,
            Err(HarvestError::Query(_))
        ));
        assert!(sessions.requests().is_empty());
    }

    #[tokio::test]
    async fn test_posts_many_runs_independent_operations() {
        let sessions = ScriptedSessions::new(|_, path| {
            if path.starts_with("/good") {
                ok(&item_page(&[("timeline-item", 7)], None))
            } else {
                RawResponse::NetworkFailure("refused".into())
            }
        });
        let harvester = harvester(&[A], false, &sessions);
        if harvester.max_parallel() < 2 {
            return;
        }

        let results = harvester
            .posts_many(vec![
                Query::new("good", SearchMode::User),
                Query::new("bad", SearchMode::User),
            ])
            .await
            .unwrap();

        assert_eq!(results[0].records.len(), 1);
        assert_eq!(results[1].termination, Termination::RetriesExhausted);
    }

    #[tokio::test]
    async fn test_explicit_instance_is_bound() {
        let sessions = ScriptedSessions::new(|_, _| ok(&item_page(&[("timeline-item", 1)], None)));
        let harvester = harvester(&[A], false, &sessions);

        let query = Query::new("acct1", SearchMode::User).with_instance(B);
        harvester.posts(&query).await.unwrap();

        assert_eq!(sessions.binds(), vec![B.to_string()]);
    }

    #[tokio::test]
    async fn test_post_by_id_returns_main_post() {
        let sessions = ScriptedSessions::new(|_, path| {
            assert_eq!(path, "/acct1/status/42");
            ok(r##"<div class="main-tweet"><div class="timeline-item"><a class="tweet-link" href="/acct1/status/42#m"></a><div class="tweet-content media-body">hello</div></div></div>"##)
        });
        let harvester = harvester(&[A], false, &sessions);

        let record = harvester.post_by_id("@acct1", "42", None).await.unwrap().unwrap();
        assert_eq!(record.link, "https://twitter.com/acct1/status/42");
        assert_eq!(record.text, "hello");
    }
}
