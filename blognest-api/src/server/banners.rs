use std::fmt::{self, Debug, Formatter};
use tracing::{debug, warn};

/// Client for the external host that stores banner images.
#[derive(Clone)]
pub struct BannerHost {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl BannerHost {
    #[must_use]
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Asks the host to drop a hosted banner. Best effort: failures are
    /// logged, never propagated.
    pub async fn delete(&self, banner_url: &str) {
        let Some(base_url) = &self.base_url else {
            debug!(banner_url, "No banner host configured, skipping remote delete");
            return;
        };

        let mut request = self
            .client
            .delete(base_url)
            .query(&[("url", banner_url)]);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(banner_url, "Deleted banner from host");
            }
            Ok(response) => {
                warn!(banner_url, status = %response.status(), "Banner host rejected the delete");
            }
            Err(err) => {
                warn!(banner_url, error = %err, "Banner host request failed");
            }
        }
    }
}

impl Debug for BannerHost {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BannerHost")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}
