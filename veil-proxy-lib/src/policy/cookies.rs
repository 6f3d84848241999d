use ahash::AHashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::CookieConfig;

/// Cookie memory shared across requests.
///
/// Keys are origin domains (host without port, lower-cased); values map a
/// cookie name to its last raw `name=value` pair.
pub trait CookieStore: Send + Sync {
    /// Remember `raw` for `name` on `domain`, overwriting any previous value
    fn record(&self, domain: &str, name: &str, raw: &str);

    /// Last raw `name=value` recorded for `name` on `domain`
    fn lookup(&self, domain: &str, name: &str) -> Option<String>;

    /// Number of domains currently held
    fn domain_count(&self) -> usize;
}

struct DomainCookies {
    cookies: AHashMap<String, String>,
    updated: Instant,
}

/// In-memory [`CookieStore`] with bounded size.
///
/// When more than `max_domains` domains are held, the domain updated least
/// recently is evicted. With a TTL, domains not updated within it are
/// treated as absent and purged on the next write.
pub struct CookieTable {
    domains: RwLock<AHashMap<String, DomainCookies>>,
    max_domains: usize,
    ttl: Option<Duration>,
}

impl CookieTable {
    /// `max_domains == 0` means unbounded
    pub fn new(max_domains: usize, ttl: Option<Duration>) -> Self {
        Self { domains: RwLock::new(AHashMap::new()), max_domains, ttl }
    }

    pub fn from_config(config: &CookieConfig) -> Self {
        Self::new(config.max_domains, config.ttl_secs.map(Duration::from_secs))
    }

    fn is_expired(&self, entry: &DomainCookies, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.updated) > ttl)
    }

    fn evict(&self, domains: &mut AHashMap<String, DomainCookies>, now: Instant) {
        if self.ttl.is_some() {
            domains.retain(|_, entry| !self.is_expired(entry, now));
        }
        if self.max_domains == 0 {
            return;
        }
        while domains.len() > self.max_domains {
            let oldest = domains
                .iter()
                .min_by_key(|(_, entry)| entry.updated)
                .map(|(domain, _)| domain.clone());
            match oldest {
                Some(domain) => {
                    tracing::debug!(domain = %domain, "Evicting cookie domain");
                    domains.remove(&domain);
                }
                None => break,
            }
        }
    }
}

impl Default for CookieTable {
    fn default() -> Self {
        Self::from_config(&CookieConfig::default())
    }
}

impl CookieStore for CookieTable {
    fn record(&self, domain: &str, name: &str, raw: &str) {
        let mut domains = match self.domains.write() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Cookie table lock poisoned");
                return;
            }
        };
        let now = Instant::now();
        let entry = domains
            .entry(domain.to_ascii_lowercase())
            .or_insert_with(|| DomainCookies { cookies: AHashMap::new(), updated: now });
        entry.cookies.insert(name.to_string(), raw.to_string());
        entry.updated = now;
        self.evict(&mut domains, now);
    }

    fn lookup(&self, domain: &str, name: &str) -> Option<String> {
        let domains = match self.domains.read() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::warn!("Cookie table lock poisoned");
                return None;
            }
        };
        let entry = domains.get(&domain.to_ascii_lowercase())?;
        if self.is_expired(entry, Instant::now()) {
            return None;
        }
        entry.cookies.get(name).cloned()
    }

    fn domain_count(&self) -> usize {
        match self.domains.read() {
            Ok(guard) => guard.len(),
            Err(_) => 0,
        }
    }
}
