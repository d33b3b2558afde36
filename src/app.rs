use camino::Utf8Path;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{TokenCache, TokenClient};
use crate::cache;
use crate::credentials::Credentials;
use crate::error::DashError;
use crate::model::Activity;
use crate::normalize::{DropTally, normalize};
use crate::strava::{ActivityClient, fetch_activities};

/// Where a table came from, so the caller can phrase its messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cache,
    Empty,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    #[serde(skip)]
    pub rows: Vec<Activity>,
    pub source: DataSource,
    pub activities: usize,
    /// Pages that returned data during a live fetch.
    pub pages: u32,
    /// True when a mid-pagination error truncated the fetch.
    pub partial: bool,
    pub dropped: DropTally,
}

impl LoadReport {
    fn live(rows: Vec<Activity>, pages: u32, partial: bool, dropped: DropTally) -> Self {
        Self {
            activities: rows.len(),
            rows,
            source: DataSource::Live,
            pages,
            partial,
            dropped,
        }
    }

    fn cached(rows: Vec<Activity>) -> Self {
        let source = if rows.is_empty() {
            DataSource::Empty
        } else {
            DataSource::Cache
        };
        Self {
            activities: rows.len(),
            rows,
            source,
            pages: 0,
            partial: false,
            dropped: DropTally::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchTunables {
    pub per_page: u32,
    pub max_pages: u32,
}

/// The sequential pipeline: token refresh, paginated fetch, normalization.
/// Generic over the two client traits so tests run it against mocks.
pub struct App<T: TokenClient, A: ActivityClient> {
    credentials: Credentials,
    token_client: T,
    activity_client: A,
    tokens: TokenCache,
}

impl<T: TokenClient, A: ActivityClient> App<T, A> {
    pub fn new(credentials: Credentials, token_client: T, activity_client: A) -> Self {
        Self {
            credentials,
            token_client,
            activity_client,
            tokens: TokenCache::new(),
        }
    }

    /// Rebuilds the table wholesale from the live API. Auth failures and
    /// zero-page fetch failures propagate; a partial fetch is reported as
    /// success with `partial` set.
    pub fn refresh_data(&mut self, tunables: FetchTunables) -> Result<LoadReport, DashError> {
        let token = self.access_token()?;
        let fetched = fetch_activities(
            &self.activity_client,
            &token,
            tunables.per_page,
            tunables.max_pages,
        )?;
        if fetched.partial {
            warn!(
                pages = fetched.pages,
                "fetch truncated, continuing with partial data"
            );
        }

        let outcome = normalize(&fetched.activities);
        info!(
            activities = outcome.rows.len(),
            pages = fetched.pages,
            dropped = outcome.dropped.total(),
            "live data loaded"
        );
        Ok(LoadReport::live(
            outcome.rows,
            fetched.pages,
            fetched.partial,
            outcome.dropped,
        ))
    }

    /// Returns a valid access token, renewing through the token client only
    /// when the cached one is missing or expired.
    fn access_token(&mut self) -> Result<String, DashError> {
        let now = Utc::now();
        if let Some(token) = self.tokens.get(now) {
            return Ok(token.to_string());
        }
        let response = self.token_client.refresh(&self.credentials)?;
        self.tokens.store(&response, now);
        info!("access token renewed");
        Ok(response.access_token)
    }

    pub fn invalidate_token(&mut self) {
        self.tokens.invalidate();
    }
}

/// Offline path: reload the cached table. A missing or corrupt cache is an
/// empty report, never an error.
pub fn load_cached(path: &Utf8Path) -> LoadReport {
    LoadReport::cached(cache::load(path))
}
