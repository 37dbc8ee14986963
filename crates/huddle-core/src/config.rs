use web_time::Duration;

/// Store-wide defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StoreConfig {
    /// TTL used when a request does not name one. Governs both staleness and
    /// how long an unobserved entry is kept before eviction.
    pub default_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    pub fn short_lived() -> Self {
        Self {
            default_ttl: Duration::from_secs(5),
        }
    }

    pub fn long_lived() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// Per-request options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FetchOptions {
    pub ttl: Option<Duration>,
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            force_refresh: false,
        }
    }

    pub fn force() -> Self {
        Self {
            ttl: None,
            force_refresh: true,
        }
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}
