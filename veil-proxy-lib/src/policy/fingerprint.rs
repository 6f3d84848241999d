use rand::Rng;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::FingerprintStrategy;

/// Header set of a real desktop browser, sent instead of the client's own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserFingerprint {
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
    pub accept_encoding: &'static str,
    /// Client hints, only sent by Chromium-based browsers
    pub sec_ch_ua: Option<&'static str>,
    pub sec_ch_ua_mobile: Option<&'static str>,
    pub sec_ch_ua_platform: Option<&'static str>,
    pub viewport_width: u32,
    pub device_pixel_ratio: &'static str,
}

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ENCODINGS: &str = "gzip, deflate, br";

/// Fixed pool of browser identities
pub const FINGERPRINTS: &[BrowserFingerprint] = &[
    BrowserFingerprint {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept: HTML_ACCEPT,
        accept_language: "en-US,en;q=0.9",
        accept_encoding: ENCODINGS,
        sec_ch_ua: Some(r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#),
        sec_ch_ua_mobile: Some("?0"),
        sec_ch_ua_platform: Some(r#""Windows""#),
        viewport_width: 1920,
        device_pixel_ratio: "1",
    },
    BrowserFingerprint {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept: HTML_ACCEPT,
        accept_language: "en-US,en;q=0.9",
        accept_encoding: ENCODINGS,
        sec_ch_ua: Some(r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#),
        sec_ch_ua_mobile: Some("?0"),
        sec_ch_ua_platform: Some(r#""macOS""#),
        viewport_width: 1440,
        device_pixel_ratio: "2",
    },
    BrowserFingerprint {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
        accept: HTML_ACCEPT,
        accept_language: "en-GB,en;q=0.9,en-US;q=0.8",
        accept_encoding: ENCODINGS,
        sec_ch_ua: Some(r#""Chromium";v="124", "Microsoft Edge";v="124", "Not-A.Brand";v="99""#),
        sec_ch_ua_mobile: Some("?0"),
        sec_ch_ua_platform: Some(r#""Windows""#),
        viewport_width: 1536,
        device_pixel_ratio: "1.25",
    },
    BrowserFingerprint {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-US,en;q=0.5",
        accept_encoding: ENCODINGS,
        sec_ch_ua: None,
        sec_ch_ua_mobile: None,
        sec_ch_ua_platform: None,
        viewport_width: 1920,
        device_pixel_ratio: "1",
    },
    BrowserFingerprint {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        accept_language: "en-US,en;q=0.9",
        accept_encoding: ENCODINGS,
        sec_ch_ua: None,
        sec_ch_ua_mobile: None,
        sec_ch_ua_platform: None,
        viewport_width: 1512,
        device_pixel_ratio: "2",
    },
];

/// Referers used when the request carries none of its own
pub const SEARCH_REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
    "https://search.yahoo.com/",
];

/// Per-request random values layered on top of a fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvasionSeed {
    /// Synthetic client address for CDN edge headers
    pub client_ip: Ipv4Addr,
    /// 16 hex digits
    pub ray_id: String,
    pub search_referer: &'static str,
}

/// Randomness capability of the policy engine
pub trait FingerprintSource: Send + Sync {
    fn next_fingerprint(&self) -> &'static BrowserFingerprint;
    fn next_seed(&self) -> EvasionSeed;
}

/// Uniform random choice for every request
#[derive(Debug, Default)]
pub struct RandomFingerprints;

impl FingerprintSource for RandomFingerprints {
    fn next_fingerprint(&self) -> &'static BrowserFingerprint {
        let mut rng = rand::thread_rng();
        &FINGERPRINTS[rng.gen_range(0..FINGERPRINTS.len())]
    }

    fn next_seed(&self) -> EvasionSeed {
        let mut rng = rand::thread_rng();
        let client_ip = loop {
            let ip = Ipv4Addr::new(rng.gen_range(1..=223), rng.r#gen(), rng.r#gen(), rng.gen_range(1..=254));
            if is_public(ip) {
                break ip;
            }
        };
        EvasionSeed {
            client_ip,
            ray_id: format!("{:016x}", rng.r#gen::<u64>()),
            search_referer: SEARCH_REFERERS[rng.gen_range(0..SEARCH_REFERERS.len())],
        }
    }
}

/// Walks the pools in order; reproducible across runs
#[derive(Debug, Default)]
pub struct RotatingFingerprints {
    fingerprint: AtomicUsize,
    seed: AtomicUsize,
}

impl FingerprintSource for RotatingFingerprints {
    fn next_fingerprint(&self) -> &'static BrowserFingerprint {
        let n = self.fingerprint.fetch_add(1, Ordering::Relaxed);
        &FINGERPRINTS[n % FINGERPRINTS.len()]
    }

    fn next_seed(&self) -> EvasionSeed {
        let n = self.seed.fetch_add(1, Ordering::Relaxed);
        EvasionSeed {
            // 203.0.113.0/24 is reserved for documentation
            client_ip: Ipv4Addr::new(203, 0, 113, (n % 254 + 1) as u8),
            ray_id: format!("{n:016x}"),
            search_referer: SEARCH_REFERERS[n % SEARCH_REFERERS.len()],
        }
    }
}

pub fn fingerprint_source(strategy: FingerprintStrategy) -> Arc<dyn FingerprintSource> {
    match strategy {
        FingerprintStrategy::Random => Arc::new(RandomFingerprints),
        FingerprintStrategy::Rotating => Arc::new(RotatingFingerprints::default()),
    }
}

fn is_public(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || a == 0
        || (a == 100 && (64..=127).contains(&b))
        || (a == 198 && (b == 18 || b == 19)))
}
