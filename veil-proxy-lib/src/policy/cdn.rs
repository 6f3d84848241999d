use http::{HeaderName, HeaderValue};

use crate::policy::fingerprint::EvasionSeed;

/// Edge network detected from the target hostname
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdnProvider {
    CloudFront,
    Cloudflare,
    Akamai,
    Vercel,
}

impl CdnProvider {
    /// Pure function of the hostname: substring match on known provider names.
    pub fn detect(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host.contains("cloudfront") {
            Some(CdnProvider::CloudFront)
        } else if host.contains("cloudflare") {
            Some(CdnProvider::Cloudflare)
        } else if host.contains("akamai") || host.contains("edgekey") || host.contains("edgesuite") {
            Some(CdnProvider::Akamai)
        } else if host.contains("vercel") {
            Some(CdnProvider::Vercel)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CdnProvider::CloudFront => "cloudfront",
            CdnProvider::Cloudflare => "cloudflare",
            CdnProvider::Akamai => "akamai",
            CdnProvider::Vercel => "vercel",
        }
    }
}

/// Headers an edge node of the provider would attach for a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdnEvasionProfile {
    pub provider: CdnProvider,
}

impl CdnEvasionProfile {
    pub fn for_host(host: &str) -> Option<Self> {
        CdnProvider::detect(host).map(|provider| Self { provider })
    }

    pub fn headers(&self, seed: &EvasionSeed) -> Vec<(HeaderName, HeaderValue)> {
        let ip = seed.client_ip.to_string();
        let pairs: Vec<(&'static str, String)> = match self.provider {
            CdnProvider::CloudFront => vec![
                ("cloudfront-viewer-address", format!("{ip}:443")),
                ("cloudfront-viewer-country", "US".to_string()),
                ("cloudfront-is-desktop-viewer", "true".to_string()),
            ],
            CdnProvider::Cloudflare => vec![
                ("cf-connecting-ip", ip),
                ("cf-ipcountry", "US".to_string()),
                ("cf-ray", format!("{}-IAD", seed.ray_id)),
                ("cf-visitor", r#"{"scheme":"https"}"#.to_string()),
            ],
            CdnProvider::Akamai => vec![
                ("true-client-ip", ip),
                ("akamai-origin-hop", "1".to_string()),
            ],
            CdnProvider::Vercel => vec![
                ("x-vercel-ip-country", "US".to_string()),
                ("x-vercel-id", format!("iad1::{}", seed.ray_id)),
                ("x-real-client-ip", ip),
            ],
        };
        pairs
            .into_iter()
            .filter_map(|(name, value)| Some((HeaderName::from_static(name), HeaderValue::from_str(&value).ok()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn seed() -> EvasionSeed {
        EvasionSeed {
            client_ip: Ipv4Addr::new(8, 8, 4, 4),
            ray_id: "00000000000000ab".into(),
            search_referer: "https://www.google.com/",
        }
    }

    #[test]
    fn detects_providers_by_substring() {
        assert_eq!(CdnProvider::detect("d1234.cloudfront.net"), Some(CdnProvider::CloudFront));
        assert_eq!(CdnProvider::detect("cdnjs.Cloudflare.com"), Some(CdnProvider::Cloudflare));
        assert_eq!(CdnProvider::detect("www.example.com.edgekey.net"), Some(CdnProvider::Akamai));
        assert_eq!(CdnProvider::detect("app.vercel.app"), Some(CdnProvider::Vercel));
        assert_eq!(CdnProvider::detect("example.com"), None);
    }

    #[test]
    fn cloudflare_headers_use_seed() {
        let headers = CdnEvasionProfile { provider: CdnProvider::Cloudflare }.headers(&seed());
        let get = |name: &str| headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone());
        assert_eq!(get("cf-connecting-ip"), Some(HeaderValue::from_static("8.8.4.4")));
        assert_eq!(get("cf-ray"), Some(HeaderValue::from_static("00000000000000ab-IAD")));
    }
}
