//! Browser-like request headers drawn from a fixed pool.

use rand::seq::IndexedRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT, PRAGMA,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

/// Desktop user agents rotated between requests.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/110.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36",
];

/// One randomized header set and the user agent it was built from.
#[derive(Debug, Clone)]
pub struct HeaderSet {
    pub user_agent: &'static str,
    pub headers: HeaderMap,
}

/// Pick a random user agent and build the full header set around it.
pub fn random_headers<R: Rng + ?Sized>(rng: &mut R) -> HeaderSet {
    let user_agent = USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0]);
    HeaderSet {
        user_agent,
        headers: build_headers(user_agent),
    }
}

/// Like [`random_headers`] but never reuses `blocked`.
///
/// Used after a 403, when the previous fingerprint is assumed to be burned.
pub fn rotate_away_from<R: Rng + ?Sized>(rng: &mut R, blocked: &str) -> HeaderSet {
    let candidates: Vec<&'static str> = USER_AGENTS
        .iter()
        .copied()
        .filter(|ua| *ua != blocked)
        .collect();
    let user_agent = candidates.choose(rng).copied().unwrap_or(USER_AGENTS[0]);
    HeaderSet {
        user_agent,
        headers: build_headers(user_agent),
    }
}

fn build_headers(user_agent: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    // Sec-Fetch headers sent by browsers on top-level navigation
    for (name, value) in [
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
    ] {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_headers_use_pool_agent() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let set = random_headers(&mut rng);
            assert!(USER_AGENTS.contains(&set.user_agent));
            assert_eq!(
                set.headers.get(USER_AGENT).unwrap().to_str().unwrap(),
                set.user_agent
            );
        }
    }

    #[test]
    fn test_browser_headers_present() {
        let mut rng = StdRng::seed_from_u64(1);
        let set = random_headers(&mut rng);
        assert!(set.headers.contains_key(ACCEPT));
        assert_eq!(
            set.headers.get(ACCEPT_LANGUAGE).unwrap(),
            "zh-CN,zh;q=0.9,en;q=0.8"
        );
        assert_eq!(set.headers.get("sec-fetch-mode").unwrap(), "navigate");
        assert_eq!(set.headers.get(DNT).unwrap(), "1");
    }

    #[test]
    fn test_rotate_away_never_repeats_blocked_agent() {
        let mut rng = StdRng::seed_from_u64(42);
        for blocked in USER_AGENTS {
            for _ in 0..10 {
                let set = rotate_away_from(&mut rng, blocked);
                assert_ne!(set.user_agent, *blocked);
            }
        }
    }
}
