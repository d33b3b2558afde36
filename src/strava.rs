use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::DashError;

pub const ACTIVITIES_URL: &str = "https://www.strava.com/api/v3/athlete/activities";

const PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// One upstream activity record, schema-variable by design: field names and
/// presence differ across API versions, so every lookup goes through the
/// normalizer's resolution tables.
pub type RawActivity = Map<String, Value>;

pub trait ActivityClient: Send + Sync {
    /// Requests a single 1-indexed page of activities.
    fn activities_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RawActivity>, DashError>;
}

#[derive(Clone)]
pub struct StravaActivityClient {
    client: Client,
    activities_url: String,
}

impl StravaActivityClient {
    pub fn new() -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rundash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DashError::ActivitiesHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(PAGE_TIMEOUT)
            .build()
            .map_err(|err| DashError::ActivitiesHttp(err.to_string()))?;

        Ok(Self {
            client,
            activities_url: ACTIVITIES_URL.to_string(),
        })
    }

    pub fn with_activities_url(activities_url: &str) -> Result<Self, DashError> {
        let mut client = Self::new()?;
        client.activities_url = activities_url.to_string();
        Ok(client)
    }
}

impl ActivityClient for StravaActivityClient {
    fn activities_page(
        &self,
        access_token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<RawActivity>, DashError> {
        let response = self
            .client
            .get(&self.activities_url)
            .bearer_auth(access_token)
            .query(&[("per_page", per_page), ("page", page)])
            .send()
            .map_err(|err| DashError::ActivitiesHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "activities request failed".to_string());
            return Err(DashError::ActivitiesStatus { status, message });
        }

        response
            .json()
            .map_err(|err| DashError::ActivitiesHttp(err.to_string()))
    }
}

/// Result of a pagination run. `pages` counts pages that returned data;
/// `partial` marks a fetch that ended on a page error after at least one
/// successful page.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub activities: Vec<RawActivity>,
    pub pages: u32,
    pub partial: bool,
}

/// Sequentially requests pages until one comes back empty or `max_pages` is
/// reached. Pages arrive in upstream order (reverse-chronological) and are
/// not re-sorted here. A page error after at least one successful page
/// truncates the fetch instead of failing it; with zero pages accumulated
/// the error propagates.
pub fn fetch_activities(
    client: &dyn ActivityClient,
    access_token: &str,
    per_page: u32,
    max_pages: u32,
) -> Result<FetchOutcome, DashError> {
    let mut activities = Vec::new();
    let mut pages = 0u32;
    let mut partial = false;

    for page in 1..=max_pages {
        match client.activities_page(access_token, page, per_page) {
            Ok(items) => {
                if items.is_empty() {
                    break;
                }
                debug!(page, count = items.len(), "fetched activities page");
                activities.extend(items);
                pages += 1;
            }
            Err(err) if activities.is_empty() => return Err(err),
            Err(err) => {
                warn!(page, error = %err, "page request failed, keeping partial result");
                partial = true;
                break;
            }
        }
    }

    Ok(FetchOutcome {
        activities,
        pages,
        partial,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;

    struct PagedClient {
        pages: Vec<Result<usize, ()>>,
        requests: Mutex<Vec<u32>>,
    }

    impl PagedClient {
        fn new(pages: Vec<Result<usize, ()>>) -> Self {
            Self {
                pages,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl ActivityClient for PagedClient {
        fn activities_page(
            &self,
            _access_token: &str,
            page: u32,
            _per_page: u32,
        ) -> Result<Vec<RawActivity>, DashError> {
            self.requests.lock().unwrap().push(page);
            match self.pages.get(page as usize - 1) {
                Some(Ok(size)) => Ok(vec![RawActivity::new(); *size]),
                Some(Err(())) => Err(DashError::ActivitiesHttp("boom".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    #[test]
    fn stops_on_empty_page() {
        let client = PagedClient::new(vec![Ok(50), Ok(50), Ok(0)]);
        let outcome = fetch_activities(&client, "token", 50, 5).unwrap();
        assert_eq!(outcome.activities.len(), 100);
        assert_eq!(outcome.pages, 2);
        assert!(!outcome.partial);
        // The empty third page is the stop signal, so three requests total.
        assert_eq!(client.request_count(), 3);
    }

    #[test]
    fn honors_page_cap() {
        let client = PagedClient::new(vec![Ok(50), Ok(50), Ok(50), Ok(50)]);
        let outcome = fetch_activities(&client, "token", 50, 2).unwrap();
        assert_eq!(outcome.activities.len(), 100);
        assert_eq!(client.request_count(), 2);
    }

    #[test]
    fn keeps_partial_result_on_mid_fetch_error() {
        let client = PagedClient::new(vec![Ok(50), Ok(30), Err(())]);
        let outcome = fetch_activities(&client, "token", 50, 5).unwrap();
        assert_eq!(outcome.activities.len(), 80);
        assert_eq!(outcome.pages, 2);
        assert!(outcome.partial);
    }

    #[test]
    fn fails_when_first_page_errors() {
        let client = PagedClient::new(vec![Err(())]);
        let err = fetch_activities(&client, "token", 50, 5).unwrap_err();
        assert_matches!(err, DashError::ActivitiesHttp(_));
    }
}
