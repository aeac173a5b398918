use crate::constants::{DEFAULT_GATEWAY_PORT, GATEWAY_OVERRIDE_GLOBAL};

/// Gateway route configuration.  Every gateway URL is built here.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    base_url: String,
}

impl Default for GatewayConfig {
    /// Points at a local gateway on the default port.  Only meant for tests
    /// and for pages without a usable `location`.
    fn default() -> Self {
        Self::from_location("http:", "localhost")
    }
}

impl GatewayConfig {
    /// Create a config from a URL string
    pub fn from_url(url: &str) -> Self {
        Self {
            base_url: url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// `{protocol}//{hostname}:8084`, with `localhost` for an empty host.
    pub fn from_location(protocol: &str, hostname: &str) -> Self {
        let host = if hostname.is_empty() { "localhost" } else { hostname };
        Self::from_url(&format!("{}//{}:{}", protocol, host, DEFAULT_GATEWAY_PORT))
    }

    /// Resolution order: page override, build-time URL, page location.
    pub fn resolve(
        page_override: Option<String>,
        build_time: Option<&str>,
        protocol: &str,
        hostname: &str,
    ) -> Self {
        page_override
            .filter(|u| !u.trim().is_empty())
            .map(|u| Self::from_url(&u))
            .or_else(|| build_time.filter(|u| !u.trim().is_empty()).map(Self::from_url))
            .unwrap_or_else(|| Self::from_location(protocol, hostname))
    }

    /// Resolve against the current window: `window.COMFY_API_BASE`, then the
    /// `GATEWAY_BASE_URL` build variable, then the page's own host.
    pub fn from_window() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::default();
        };
        let page_override = js_sys::Reflect::get(&window, &GATEWAY_OVERRIDE_GLOBAL.into())
            .ok()
            .and_then(|v| v.as_string());
        let location = window.location();
        let protocol = location.protocol().unwrap_or_else(|_| "http:".to_string());
        let hostname = location.hostname().unwrap_or_default();
        Self::resolve(
            page_override,
            option_env!("GATEWAY_BASE_URL"),
            &protocol,
            &hostname,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn workflows_url(&self) -> String {
        format!("{}/v1/workflows", self.base_url)
    }

    pub fn job_url(&self, job_id: &str) -> String {
        format!("{}/v1/jobs/{}", self.base_url, job_id)
    }

    /// Output image URL with a cache-busting token.
    pub fn output_url(&self, job_id: &str, token: &str) -> String {
        format!("{}/v1/jobs/{}/output?ts={}", self.base_url, job_id, token)
    }

    pub fn events_url(&self, job_id: Option<&str>) -> String {
        match job_id {
            Some(id) => format!("{}/v1/events?id={}", self.base_url, id),
            None => format!("{}/v1/events", self.base_url),
        }
    }

    pub fn checkpoints_url(&self) -> String {
        format!("{}/v1/checkpoints", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_fallback_uses_default_port() {
        let cfg = GatewayConfig::from_location("https:", "studio.local");
        assert_eq!(cfg.base_url(), "https://studio.local:8084");
        let cfg = GatewayConfig::from_location("http:", "");
        assert_eq!(cfg.base_url(), "http://localhost:8084");
    }

    #[test]
    fn override_beats_build_time_beats_location() {
        let cfg = GatewayConfig::resolve(
            Some("http://gw:9000/".into()),
            Some("http://build:1"),
            "http:",
            "page",
        );
        assert_eq!(cfg.base_url(), "http://gw:9000");

        let cfg = GatewayConfig::resolve(Some("  ".into()), Some("http://build:1/"), "http:", "page");
        assert_eq!(cfg.base_url(), "http://build:1");

        let cfg = GatewayConfig::resolve(None, None, "http:", "page");
        assert_eq!(cfg.base_url(), "http://page:8084");
    }

    #[test]
    fn routes() {
        let cfg = GatewayConfig::from_url("http://gw");
        assert_eq!(cfg.workflows_url(), "http://gw/v1/workflows");
        assert_eq!(cfg.job_url("abc"), "http://gw/v1/jobs/abc");
        assert_eq!(cfg.output_url("abc", "1-2"), "http://gw/v1/jobs/abc/output?ts=1-2");
        assert_eq!(cfg.events_url(Some("abc")), "http://gw/v1/events?id=abc");
        assert_eq!(cfg.events_url(None), "http://gw/v1/events");
        assert_eq!(cfg.checkpoints_url(), "http://gw/v1/checkpoints");
    }
}
