use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{RequestCache, RequestMode};

use super::config::GatewayConfig;
use crate::constants::DEFAULT_WORKFLOW_PATH;
use crate::error::{FrontendError, Result};
use crate::models::{CheckpointsResponse, JobStatusResponse, SubmitResponse};

/// REST client for the job gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Submit a serialized graph.  A 202 with an empty body still counts as
    /// accepted.
    pub async fn submit_workflow(&self, payload: &Value) -> Result<SubmitResponse> {
        let body = serde_json::to_string(payload)?;
        let text = fetch_text(&self.config.workflows_url(), "POST", Some(&body), None).await?;
        decode_or_default(&text)
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse> {
        let text = fetch_text(&self.config.job_url(job_id), "GET", None, None).await?;
        decode_or_default(&text)
    }

    pub async fn checkpoints(&self) -> Result<Vec<String>> {
        let text = fetch_text(&self.config.checkpoints_url(), "GET", None, None).await?;
        let resp: CheckpointsResponse = decode_or_default(&text)?;
        Ok(resp.checkpoints)
    }
}

/// The bundled default workflow, always fetched fresh.
pub async fn fetch_default_workflow() -> Result<Value> {
    let text = fetch_text(DEFAULT_WORKFLOW_PATH, "GET", None, Some(RequestCache::NoStore)).await?;
    Ok(serde_json::from_str(&text)?)
}

fn decode_or_default<T: DeserializeOwned + Default>(text: &str) -> Result<T> {
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(text)?)
}

/// Fetch `url` and return the body text.  Non-2xx responses are errors.
pub async fn fetch_text(
    url: &str,
    method: &str,
    body: Option<&str>,
    cache: Option<RequestCache>,
) -> Result<String> {
    use web_sys::{Headers, Request, RequestInit, Response};

    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);
    if let Some(cache) = cache {
        opts.set_cache(cache);
    }

    let headers = Headers::new()?;
    if let Some(data) = body {
        opts.set_body(&JsValue::from_str(data));
        headers.append("Content-Type", "application/json")?;
    }
    opts.set_headers(&headers);

    let request = Request::new_with_str_and_init(url, &opts)?;

    let window = web_sys::window().ok_or_else(|| FrontendError::Js("no global window".into()))?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
    let resp: Response = resp_value.dyn_into()?;

    if !resp.ok() {
        return Err(FrontendError::Http {
            status: resp.status(),
            url: url.to_string(),
        });
    }

    let text = JsFuture::from(resp.text()?).await?;
    Ok(text.as_string().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_without_body_decodes_to_default() {
        let resp: SubmitResponse = decode_or_default("").unwrap();
        assert_eq!(resp, SubmitResponse::default());
    }

    #[test]
    fn submit_response_adopts_gateway_fields() {
        let resp: SubmitResponse =
            decode_or_default(r#"{"job_id":"abc","status":"queued"}"#).unwrap();
        assert_eq!(resp.job_id.as_deref(), Some("abc"));
        assert_eq!(resp.status.as_deref(), Some("queued"));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_or_default::<JobStatusResponse>("<html>").unwrap_err();
        assert!(matches!(err, FrontendError::Decode(_)));
    }
}
