//! HTTP POST strategy
//!
//! The request body depends on the declared content kind. See
//! [`ContentKind`] for the selection table.

use super::http::HttpProber;
use crate::contracts::{HttpHeader, ProbeOutcome};
use crate::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// How a POST body is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Body string sent verbatim as JSON
    Json,
    /// Form values urlencoded into the body
    UrlEncodedForm,
    /// Body bytes sent verbatim under the caller's content type
    Raw,
}

impl ContentKind {
    /// Kind for a declared `Content-Type` value (parameters ignored)
    pub fn from_content_type(value: &str) -> Self {
        let media_type = value.split(';').next().unwrap_or_default().trim();
        if media_type.eq_ignore_ascii_case(CONTENT_TYPE_JSON) {
            ContentKind::Json
        } else if media_type.eq_ignore_ascii_case(CONTENT_TYPE_FORM) {
            ContentKind::UrlEncodedForm
        } else {
            ContentKind::Raw
        }
    }

    /// Kind for a request.
    ///
    /// A declared `Content-Type` decides. Without one, form values mean a
    /// form and anything else is sent as JSON.
    pub fn resolve(headers: &HeaderMap, has_form: bool) -> Self {
        match headers.get(CONTENT_TYPE) {
            Some(value) => Self::from_content_type(value.to_str().unwrap_or_default()),
            None if has_form => ContentKind::UrlEncodedForm,
            None => ContentKind::Json,
        }
    }

    /// Content type to add when the caller declared none
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            ContentKind::Json => Some(CONTENT_TYPE_JSON),
            ContentKind::UrlEncodedForm => Some(CONTENT_TYPE_FORM),
            ContentKind::Raw => None,
        }
    }

    /// Request body for this kind
    pub fn encode(&self, body: &str, form: Option<&BTreeMap<String, Vec<String>>>) -> Vec<u8> {
        match (self, form) {
            (ContentKind::UrlEncodedForm, Some(form)) => encode_form(form).into_bytes(),
            _ => body.as_bytes().to_vec(),
        }
    }
}

/// Urlencode form values, keys sorted and values in order
pub fn encode_form(form: &BTreeMap<String, Vec<String>>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, values) in form {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

impl HttpProber {
    /// Probe `url` with a POST request.
    ///
    /// Classification matches [`HttpProber::get`]. Only a failure to read the
    /// response body is returned as an error.
    pub async fn post(
        &self,
        url: &Url,
        headers: &[HttpHeader],
        form: Option<&BTreeMap<String, Vec<String>>>,
        body: &str,
        timeout: Duration,
    ) -> Result<ProbeOutcome> {
        let mut headers = match self.request_headers(headers) {
            Ok(headers) => headers,
            Err(reason) => return Ok(ProbeOutcome::failure(reason)),
        };

        let kind = ContentKind::resolve(&headers, form.is_some());
        if !headers.contains_key(CONTENT_TYPE) {
            if let Some(content_type) = kind.default_content_type() {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }
        tracing::debug!(%url, ?kind, "HTTP POST probe body");

        let request = self
            .client()
            .post(url.clone())
            .headers(headers)
            .body(kind.encode(body, form))
            .timeout(timeout);

        self.execute(request, url).await
    }
}
