use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::errors::{FinderError, Result};

/// Requests allowed in flight against the booking sites at once.
const PARALLELISM: usize = 2;
/// Pause held by each request slot after its response arrives.
const REQUEST_DELAY: Duration = Duration::from_secs(1);

const USER_AGENT: &str = concat!("tee_finder/", env!("CARGO_PKG_VERSION"));

/// At most `permits` jobs at once; each slot is held for `delay` after its job ends.
#[derive(Clone)]
struct Throttle {
    permits: Arc<Semaphore>,
    delay: Duration,
}

impl Throttle {
    fn new(permits: usize, delay: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(permits)),
            delay,
        }
    }

    async fn run<T>(&self, url: &str, job: impl Future<Output = Result<T>>) -> Result<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FinderError::fetch(url, e))?;
        let result = job.await;
        tokio::time::sleep(self.delay).await;
        result
    }
}

/// Shared, rate-limited HTTP getter used by every site adapter.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    throttle: Throttle,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FinderError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            throttle: Throttle::new(PARALLELISM, REQUEST_DELAY),
        })
    }

    /// GET a page body. Non-2xx responses are fetch errors.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        self.throttle.run(url, self.get_once(url)).await
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FinderError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FinderError::fetch(url, format!("HTTP {}", status)));
        }
        response.text().await.map_err(|e| FinderError::fetch(url, e))
    }
}
