//! HTTP transport shared by the GET and POST strategies, and the GET strategy
//!
//! Every probe goes through one client configured so that probes behave the
//! same regardless of the environment the prober runs in: no TLS
//! verification, no connection reuse, no proxy from the environment.

use super::url::build_headers;
use super::{truncate_output, ProberOptions, MAX_OUTPUT_LENGTH};
use crate::contracts::{HttpHeader, ProbeOutcome};
use crate::error::{ProbeError, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;

/// Redirect hops followed before the request is abandoned
pub const MAX_REDIRECTS: usize = 10;

/// HTTP prober (GET and POST)
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    user_agent: HeaderValue,
}

impl HttpProber {
    pub fn new(options: &ProberOptions) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .pool_max_idle_per_host(0)
            .redirect(redirect_policy(options.follow_non_local_redirects))
            .build()?;

        let user_agent = HeaderValue::from_str(&options.user_agent)
            .map_err(|e| ProbeError::invalid_user_agent(options.user_agent.as_str(), e))?;

        Ok(Self { client, user_agent })
    }

    /// Probe `url` with a GET request.
    ///
    /// 2xx is Success, 3xx (a redirect that was not followed) is Warning and
    /// anything else is Failure. Transport errors are Failures, not errors.
    pub async fn get(
        &self,
        url: &Url,
        headers: &[HttpHeader],
        timeout: Duration,
    ) -> Result<ProbeOutcome> {
        let headers = match self.request_headers(headers) {
            Ok(headers) => headers,
            Err(reason) => return Ok(ProbeOutcome::failure(reason)),
        };

        let request = self
            .client
            .get(url.clone())
            .headers(headers)
            .timeout(timeout);

        self.execute(request, url).await
    }

    pub(super) fn client(&self) -> &Client {
        &self.client
    }

    /// Caller headers plus the default User-Agent when none was given
    pub(super) fn request_headers(
        &self,
        headers: &[HttpHeader],
    ) -> std::result::Result<HeaderMap, String> {
        let mut map = build_headers(headers)?;
        if !map.contains_key(USER_AGENT) {
            map.insert(USER_AGENT, self.user_agent.clone());
        }
        Ok(map)
    }

    /// Send the request and classify the response
    pub(super) async fn execute(&self, request: RequestBuilder, url: &Url) -> Result<ProbeOutcome> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                // Timeouts and refused connections land here; they say the target is down.
                tracing::debug!(%url, error = %e, "HTTP probe request failed");
                return Ok(ProbeOutcome::failure(e.to_string()));
            }
        };

        let status = response.status();
        let body = read_at_most(response, MAX_OUTPUT_LENGTH, url).await?;
        Ok(classify(status, &body, url))
    }
}

fn redirect_policy(follow_non_local_redirects: bool) -> Policy {
    if follow_non_local_redirects {
        return Policy::limited(MAX_REDIRECTS);
    }

    Policy::custom(|attempt| {
        let leaves_origin = attempt
            .previous()
            .first()
            .map(|origin| origin.host_str() != attempt.url().host_str())
            .unwrap_or(false);

        if leaves_origin {
            // Hand the redirect response itself back to the caller.
            attempt.stop()
        } else if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error(format!("stopped after {} redirects", MAX_REDIRECTS))
        } else {
            attempt.follow()
        }
    })
}

/// Read the body up to `limit` bytes; anything beyond is dropped
async fn read_at_most(mut response: Response, limit: usize, url: &Url) -> Result<Vec<u8>> {
    let mut body = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| ProbeError::ResponseBody {
            url: url.to_string(),
            source,
        })?
    {
        let remaining = limit - body.len();
        if chunk.len() > remaining {
            body.extend_from_slice(&chunk[..remaining]);
            tracing::debug!(%url, limit, "Non fatal body truncation");
            break;
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

fn classify(status: StatusCode, body: &[u8], url: &Url) -> ProbeOutcome {
    let code = status.as_u16();
    let output = truncate_output(body);

    match code {
        200..=299 => {
            tracing::debug!(%url, code, "Probe succeeded");
            ProbeOutcome::success(output)
        }
        300..=399 => {
            tracing::debug!(%url, code, "Probe terminated redirects");
            ProbeOutcome::warning(output)
        }
        _ => {
            tracing::debug!(%url, code, body = %output, "Probe failed");
            ProbeOutcome::failure(format!("HTTP probe failed with statuscode: {}", code))
        }
    }
}
