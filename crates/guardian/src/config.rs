//! Guardian client configuration

use guardian_transport::{NetworkConfig, Url};

use crate::error::{GuardianError, GuardianResult};

/// Where the Guardian API lives and how to reach it
#[derive(Debug, Clone)]
pub struct GuardianConfig {
    base_url: Url,
    network: NetworkConfig,
}

impl GuardianConfig {
    /// Create a configuration for an absolute `http(s)` base URL
    ///
    /// The base path always ends with `/`, so endpoints resolve under it.
    pub fn new(base_url: &str, network: NetworkConfig) -> GuardianResult<Self> {
        let mut url = Url::parse(base_url).map_err(|e| invalid_url(base_url, &e.to_string()))?;

        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid_url(base_url, "scheme must be http or https"));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid_url(base_url, "URL has no host"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid_url(base_url, "URL must not carry a query or fragment"));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            base_url: url,
            network,
        })
    }

    /// Configuration for a Guardian tenant domain, e.g. `tenant.guardian.auth0.com`
    pub fn for_domain(domain: &str, network: NetworkConfig) -> GuardianResult<Self> {
        Self::new(&format!("https://{domain}/"), network)
    }

    /// Configuration using the process-wide network defaults
    pub fn with_shared_network(base_url: &str) -> GuardianResult<Self> {
        let network = NetworkConfig::shared()?.clone();
        Self::new(base_url, network)
    }

    /// Base URL, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Network settings
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Resolve `segments` as path segments under the base URL
    ///
    /// Each segment is percent-encoded, so identifiers cannot escape their position.
    pub fn endpoint(&self, segments: &[&str]) -> GuardianResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| invalid_url(self.base_url.as_str(), "URL cannot be a base"))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }
}

fn invalid_url(url: &str, reason: &str) -> GuardianError {
    GuardianError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> NetworkConfig {
        NetworkConfig::builder().build().unwrap()
    }

    #[test]
    fn test_base_url_normalization() {
        let config = GuardianConfig::new("https://tenant.guardian.auth0.com", network()).unwrap();
        assert_eq!(config.base_url().as_str(), "https://tenant.guardian.auth0.com/");

        let config =
            GuardianConfig::new("https://tenant.example.com/appliance-mfa", network()).unwrap();
        assert_eq!(
            config.base_url().as_str(),
            "https://tenant.example.com/appliance-mfa/"
        );
    }

    #[test]
    fn test_endpoint_resolution() {
        let config =
            GuardianConfig::new("https://tenant.example.com/appliance-mfa/", network()).unwrap();
        assert_eq!(
            config
                .endpoint(&["api", "resolve-transaction"])
                .unwrap()
                .as_str(),
            "https://tenant.example.com/appliance-mfa/api/resolve-transaction"
        );
        assert_eq!(
            config
                .endpoint(&["rich-consents", "cns/../x"])
                .unwrap()
                .as_str(),
            "https://tenant.example.com/appliance-mfa/rich-consents/cns%2F..%2Fx"
        );
    }

    #[test]
    fn test_for_domain() {
        let config = GuardianConfig::for_domain("tenant.guardian.auth0.com", network()).unwrap();
        assert_eq!(config.base_url().as_str(), "https://tenant.guardian.auth0.com/");
    }

    #[test]
    fn test_rejects_unusable_urls() {
        for url in [
            "tenant.guardian.auth0.com",
            "ftp://tenant.guardian.auth0.com",
            "mailto:someone@example.com",
            "https://tenant.example.com/?x=1",
        ] {
            assert!(
                matches!(
                    GuardianConfig::new(url, network()),
                    Err(GuardianError::InvalidUrl { .. })
                ),
                "{url} should be rejected"
            );
        }
    }
}
