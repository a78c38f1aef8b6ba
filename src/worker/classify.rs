//! Request classification for the offline controller.
//!
//! Every intercepted request maps to exactly one of a closed set of
//! handling strategies, keyed off request metadata rather than ad hoc
//! string checks scattered through the handlers.

use reqwest::Method;

/// An intercepted outbound request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Whether this request loads a top-level document
    pub navigation: bool,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            navigation: false,
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
            navigation: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn navigation(mut self) -> Self {
        self.navigation = true;
        self
    }
}

/// The closed set of request classes the controller handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Remote provider call: network first, degraded fallback
    Api,
    /// Asset fetch: cache first
    Static,
    /// Not intercepted: direct pass-through
    Bypass,
}

/// Map a request to its handling class.
///
/// Requests to the provider host are `Api` regardless of method; any
/// other GET is `Static`; everything else passes through untouched.
pub fn classify(request: &FetchRequest, api_host: &str) -> RequestClass {
    let host = reqwest::Url::parse(&request.url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string));

    if host.as_deref() == Some(api_host) {
        return RequestClass::Api;
    }

    if request.method == Method::GET {
        RequestClass::Static
    } else {
        RequestClass::Bypass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API_HOST: &str = "api.groq.com";

    #[test]
    fn test_provider_requests_are_api() {
        let post = FetchRequest::post(
            "https://api.groq.com/openai/v1/audio/transcriptions",
            vec![],
        );
        let get = FetchRequest::get("https://api.groq.com/openai/v1/models");

        assert_eq!(classify(&post, API_HOST), RequestClass::Api);
        assert_eq!(classify(&get, API_HOST), RequestClass::Api);
    }

    #[test]
    fn test_other_gets_are_static() {
        let absolute = FetchRequest::get("https://fonts.googleapis.com/css2?family=Inter");
        let relative = FetchRequest::get("/index.html");

        assert_eq!(classify(&absolute, API_HOST), RequestClass::Static);
        assert_eq!(classify(&relative, API_HOST), RequestClass::Static);
    }

    #[test]
    fn test_non_get_non_api_bypasses() {
        let post = FetchRequest::post("https://example.com/submit", vec![1]);
        assert_eq!(classify(&post, API_HOST), RequestClass::Bypass);
    }

    #[test]
    fn test_lookalike_host_is_not_api() {
        let request = FetchRequest::get("https://api.groq.com.evil.example/models");
        assert_eq!(classify(&request, API_HOST), RequestClass::Static);
    }
}
