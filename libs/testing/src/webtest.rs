//! Scripted HTTP driver.
//!
//! A [`WebTest`] sends one [`TestCase`] at a time against a running server,
//! resolving `:placeholder` tokens from its [`Bag`] first and feeding named
//! groups of matched body patterns back into it. Transport problems abort the
//! case with a [`WebTestError`]; wrong status codes or bodies are collected as
//! [`Mismatch`]es on the returned [`CaseReport`].

use std::collections::HashSet;
use std::fmt;
use std::net::TcpListener;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::bag::{Bag, Mode};
use crate::stopwatch::Stopwatch;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum WebTestError {
    #[error("could not create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("could not build request for {url}: {source}")]
    Build {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("could not read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("could not serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid body pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unsupported payload type: {0}")]
    UnsupportedPayload(&'static str),

    #[error("unsupported expected body type: {0}")]
    UnsupportedExpectation(&'static str),

    #[error("invalid expected status code {0}")]
    InvalidStatus(u16),

    #[error("unresolved placeholders: {}", .names.join(", "))]
    UnresolvedPlaceholder { names: Vec<String> },
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    /// Sent as is after substitution.
    Raw(String),
    /// Serialised in insertion order, then substituted as text.
    Json(Map<String, Value>),
}

impl Payload {
    /// Objects become [`Payload::Json`], strings [`Payload::Raw`] and `null`
    /// no body. Anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self, WebTestError> {
        match value {
            Value::Null => Ok(Payload::None),
            Value::String(s) => Ok(Payload::Raw(s)),
            Value::Object(map) => Ok(Payload::Json(map)),
            other => Err(WebTestError::UnsupportedPayload(kind_of(&other))),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

/// What the response body must look like.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Expectation {
    /// Only the status code is checked.
    #[default]
    StatusOnly,
    /// Trimmed body equals this text.
    Text(String),
    /// Body decodes to a JSON object equal to this one.
    Json(Map<String, Value>),
    /// Trimmed body contains a match of this pattern. Placeholders are
    /// substituted regex-escaped; named groups are captured into the bag.
    Pattern(String),
}

/// How [`Expectation::Json`] compares objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonComparison {
    /// Structural and type-aware. Numbers compare by value, so `2` equals
    /// `2.0`, and arrays element-wise.
    #[default]
    Typed,
    /// Nested objects recurse; every other value compares by its string
    /// rendering, so `19.99` equals `"19.99"`.
    Stringified,
}

/// Whether unknown `:placeholder` tokens fail a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderPolicy {
    /// Abort with [`WebTestError::UnresolvedPlaceholder`] before sending.
    /// Only tokens [`Bag::unresolved`] recognises count, so `a:b` inside
    /// prose is sent as is.
    #[default]
    Strict,
    /// Send the literal token.
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub method: Method,
    /// May contain `:placeholder` tokens. A single leading `/` is dropped.
    pub path: String,
    payload: Result<Payload, &'static str>,
    status: Result<StatusCode, u16>,
    expect: Result<Expectation, &'static str>,
}

impl TestCase {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            payload: Ok(Payload::None),
            status: Ok(StatusCode::OK),
            expect: Ok(Expectation::StatusOnly),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Body from an arbitrary JSON value. Shapes [`Payload::from_value`]
    /// rejects make the case abort when executed.
    pub fn json(mut self, value: Value) -> Self {
        self.payload = Payload::from_value(value).map_err(|e| match e {
            WebTestError::UnsupportedPayload(kind) => kind,
            _ => "unknown",
        });
        self
    }

    pub fn raw(mut self, text: impl Into<String>) -> Self {
        self.payload = Ok(Payload::Raw(text.into()));
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Ok(payload);
        self
    }

    /// Codes outside `100..=999` make the case abort when executed.
    pub fn status(mut self, status: u16) -> Self {
        self.status = StatusCode::from_u16(status).map_err(|_| status);
        self
    }

    pub fn expect_text(mut self, text: impl Into<String>) -> Self {
        self.expect = Ok(Expectation::Text(text.into()));
        self
    }

    /// Only objects can be compared; any other value makes the case abort
    /// when executed.
    pub fn expect_json(mut self, value: Value) -> Self {
        self.expect = match value {
            Value::Object(map) => Ok(Expectation::Json(map)),
            other => Err(kind_of(&other)),
        };
        self
    }

    pub fn expect_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.expect = Ok(Expectation::Pattern(pattern.into()));
        self
    }

    pub fn expected_status(&self) -> Result<StatusCode, WebTestError> {
        self.status.map_err(WebTestError::InvalidStatus)
    }

    pub fn expectation(&self) -> Result<&Expectation, WebTestError> {
        self.expect
            .as_ref()
            .map_err(|kind| WebTestError::UnsupportedExpectation(*kind))
    }

    pub fn body(&self) -> Result<&Payload, WebTestError> {
        self.payload
            .as_ref()
            .map_err(|kind| WebTestError::UnsupportedPayload(*kind))
    }
}

/// A difference between the expected and the actual response.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Status {
        expected: StatusCode,
        actual: StatusCode,
    },
    Body {
        expected: String,
        actual: String,
    },
    Pattern {
        pattern: String,
        body: String,
    },
    NotJson {
        body: String,
        error: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Status { expected, actual } => {
                write!(f, "expected status {expected}, got {actual}")
            }
            Mismatch::Body { expected, actual } => {
                write!(f, "expected body {expected}, got {actual}")
            }
            Mismatch::Pattern { pattern, body } => {
                write!(f, "response body {body} does not match pattern {pattern}")
            }
            Mismatch::NotJson { body, error } => {
                write!(f, "response body {body} is not a JSON object: {error}")
            }
        }
    }
}

/// Outcome of one executed case.
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub status: StatusCode,
    /// Trimmed response body.
    pub body: String,
    /// From dispatch until response headers arrived.
    pub elapsed: Duration,
    pub mismatches: Vec<Mismatch>,
}

impl CaseReport {
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct WebTest {
    client: Client,
    base_url: String,
    timeout: Duration,
    bag: Bag,
    placeholders: PlaceholderPolicy,
    comparison: JsonComparison,
}

impl WebTest {
    /// Driver for `http://localhost:<port>/`.
    pub fn new(port: u16) -> Result<Self, WebTestError> {
        let client = Client::builder().build().map_err(WebTestError::Client)?;
        Ok(Self {
            client,
            base_url: format!("http://localhost:{port}/"),
            timeout: DEFAULT_TIMEOUT,
            bag: Bag::new(),
            placeholders: PlaceholderPolicy::default(),
            comparison: JsonComparison::default(),
        })
    }

    /// A trailing `/` is added when missing.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_placeholder_policy(mut self, policy: PlaceholderPolicy) -> Self {
        self.placeholders = policy;
        self
    }

    pub fn with_json_comparison(mut self, comparison: JsonComparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    /// Send `case` and check the response against it.
    pub async fn execute(&mut self, case: &TestCase) -> Result<CaseReport, WebTestError> {
        let path = case.path.strip_prefix('/').unwrap_or(&case.path);
        let payload = case.body()?;
        let expected_status = case.expected_status()?;
        let expect = case.expectation()?;

        if self.placeholders == PlaceholderPolicy::Strict {
            self.ensure_resolved(path, payload, expect)?;
        }

        let url = format!("{}{}", self.base_url, self.bag.substitute(path, Mode::Literal));
        let body = match payload {
            Payload::None => None,
            Payload::Raw(text) => Some(self.bag.substitute(text, Mode::Literal)),
            Payload::Json(map) => Some(
                self.bag
                    .substitute(&serde_json::to_string(map)?, Mode::Literal),
            ),
        };

        let pattern = match expect {
            Expectation::Pattern(raw) => {
                let pattern = self.bag.substitute(raw, Mode::Regex);
                match Regex::new(&pattern) {
                    Ok(re) => Some(re),
                    Err(source) => return Err(WebTestError::InvalidPattern { pattern, source }),
                }
            }
            _ => None,
        };

        let mut request = self
            .client
            .request(case.method.clone(), &url)
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        let request = request.build().map_err(|source| WebTestError::Build {
            url: url.clone(),
            source,
        })?;

        let mut stopwatch = Stopwatch::started();
        let sent = self.client.execute(request).await;
        let elapsed = stopwatch.stop();

        let response = sent.map_err(|source| {
            if source.is_timeout() {
                WebTestError::Timeout {
                    url: url.clone(),
                    timeout: self.timeout,
                }
            } else {
                WebTestError::Request {
                    url: url.clone(),
                    source,
                }
            }
        })?;

        let status = response.status();
        let text = response.text().await.map_err(WebTestError::Body)?;
        let body = text.trim().to_string();

        debug!(
            method = %case.method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        let mut mismatches = Vec::new();
        if status != expected_status {
            mismatches.push(Mismatch::Status {
                expected: expected_status,
                actual: status,
            });
        }

        match expect {
            Expectation::StatusOnly => {}
            Expectation::Text(expected) => {
                if body != *expected {
                    mismatches.push(Mismatch::Body {
                        expected: expected.clone(),
                        actual: body.clone(),
                    });
                }
            }
            Expectation::Json(expected) => match serde_json::from_str::<Map<String, Value>>(&body) {
                Ok(actual) => {
                    if !objects_equal(expected, &actual, self.comparison) {
                        mismatches.push(Mismatch::Body {
                            expected: Value::Object(expected.clone()).to_string(),
                            actual: body.clone(),
                        });
                    }
                }
                Err(e) => mismatches.push(Mismatch::NotJson {
                    body: body.clone(),
                    error: e.to_string(),
                }),
            },
            Expectation::Pattern(_) => {
                if let Some(re) = &pattern {
                    match re.captures(&body) {
                        Some(captures) => {
                            self.bag.capture(&captures, re);
                        }
                        None => mismatches.push(Mismatch::Pattern {
                            pattern: re.as_str().to_string(),
                            body: body.clone(),
                        }),
                    }
                }
            }
        }

        Ok(CaseReport {
            status,
            body,
            elapsed,
            mismatches,
        })
    }

    fn ensure_resolved(
        &self,
        path: &str,
        payload: &Payload,
        expect: &Expectation,
    ) -> Result<(), WebTestError> {
        let mut names = self.bag.unresolved(path);
        match payload {
            Payload::None => {}
            Payload::Raw(text) => names.extend(self.bag.unresolved(text)),
            Payload::Json(map) => {
                for value in map.values() {
                    collect_unresolved(&self.bag, value, &mut names);
                }
            }
        }
        if let Expectation::Pattern(pattern) = expect {
            names.extend(self.bag.unresolved(pattern));
        }

        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));
        if names.is_empty() {
            Ok(())
        } else {
            Err(WebTestError::UnresolvedPlaceholder { names })
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Placeholders only make sense inside JSON strings; other scalars and the
/// object keys are never scanned.
fn collect_unresolved(bag: &Bag, value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(s) => names.extend(bag.unresolved(s)),
        Value::Array(items) => {
            for item in items {
                collect_unresolved(bag, item, names);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_unresolved(bag, item, names);
            }
        }
        _ => {}
    }
}

fn objects_equal(
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    comparison: JsonComparison,
) -> bool {
    expected.len() == actual.len()
        && expected.iter().all(|(key, want)| {
            actual
                .get(key)
                .is_some_and(|got| values_equal(want, got, comparison))
        })
}

fn values_equal(expected: &Value, actual: &Value, comparison: JsonComparison) -> bool {
    match (expected, actual) {
        (Value::Object(want), Value::Object(got)) => objects_equal(want, got, comparison),
        (Value::Object(_), _) => false,
        _ if comparison == JsonComparison::Stringified => render(expected) == render(actual),
        (Value::Number(want), Value::Number(got)) => want.as_f64() == got.as_f64(),
        (Value::Array(want), Value::Array(got)) => {
            want.len() == got.len()
                && want
                    .iter()
                    .zip(got)
                    .all(|(w, g)| values_equal(w, g, comparison))
        }
        _ => expected == actual,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.to_string())
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// A port nothing is listening on right now.
pub fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// `name-<unix nanos>`, unique enough for entity names within one run.
pub fn random_name() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("name-{nanos}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[rstest]
    #[case(json!({"a": 2}), json!({"a": 2.0}), true)]
    #[case(json!({"a": [1, 2]}), json!({"a": [1.0, 2]}), true)]
    #[case(json!({"a": [1, 2]}), json!({"a": [2, 1]}), false)]
    #[case(json!({"a": 19.99}), json!({"a": "19.99"}), false)]
    #[case(json!({"a": {"b": true}}), json!({"a": {"b": true}}), true)]
    #[case(json!({"a": 1}), json!({"a": 1, "b": 2}), false)]
    #[case(json!({"a": null}), json!({"b": null}), false)]
    fn test_typed_comparison(#[case] want: Value, #[case] got: Value, #[case] equal: bool) {
        assert_eq!(
            objects_equal(&object(want), &object(got), JsonComparison::Typed),
            equal
        );
    }

    #[rstest]
    #[case(json!({"a": 19.99}), json!({"a": "19.99"}), true)]
    #[case(json!({"a": 2}), json!({"a": 2.0}), true)]
    #[case(json!({"a": true}), json!({"a": "true"}), true)]
    #[case(json!({"a": {"b": 1}}), json!({"a": "{\"b\":1}"}), false)]
    #[case(json!({"a": "x"}), json!({"a": "y"}), false)]
    fn test_stringified_comparison(#[case] want: Value, #[case] got: Value, #[case] equal: bool) {
        assert_eq!(
            objects_equal(&object(want), &object(got), JsonComparison::Stringified),
            equal
        );
    }

    #[test]
    fn test_payload_from_value() {
        assert_eq!(Payload::from_value(Value::Null).unwrap(), Payload::None);
        assert_eq!(
            Payload::from_value(json!("invalid json")).unwrap(),
            Payload::Raw("invalid json".to_string())
        );
        assert!(matches!(
            Payload::from_value(json!({"key": "value"})).unwrap(),
            Payload::Json(_)
        ));
        assert!(matches!(
            Payload::from_value(json!([1, 2])),
            Err(WebTestError::UnsupportedPayload("array"))
        ));
    }

    #[test]
    fn test_json_payload_keeps_insertion_order() {
        let payload = Payload::from_value(json!({"zeta": 1, "alpha": 2})).unwrap();
        let Payload::Json(map) = payload else {
            panic!("expected JSON payload");
        };
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"zeta":1,"alpha":2}"#);
    }

    #[test]
    fn test_unsupported_json_case_errors_on_body() {
        let case = TestCase::post("/").json(json!(42));
        assert!(matches!(
            case.body(),
            Err(WebTestError::UnsupportedPayload("number"))
        ));
    }

    #[rstest]
    #[case(json!([1, 2, 3]), "array")]
    #[case(json!("text"), "string")]
    #[case(json!(null), "null")]
    #[case(json!(7), "number")]
    fn test_non_object_json_expectation_is_rejected(#[case] value: Value, #[case] kind: &str) {
        let case = TestCase::get("/empty").expect_json(value);
        match case.expectation() {
            Err(WebTestError::UnsupportedExpectation(got)) => assert_eq!(got, kind),
            other => panic!("expected unsupported expectation, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_status_is_kept_for_execute() {
        let case = TestCase::get("/").status(42);
        assert!(matches!(
            case.expected_status(),
            Err(WebTestError::InvalidStatus(42))
        ));
        assert_eq!(
            TestCase::get("/").status(204).expected_status().unwrap(),
            StatusCode::NO_CONTENT
        );
    }

    #[test]
    fn test_builder_defaults() {
        let case = TestCase::get("/ping");
        assert_eq!(case.method, Method::GET);
        assert_eq!(case.expected_status().unwrap(), StatusCode::OK);
        assert_eq!(case.expectation().unwrap(), &Expectation::StatusOnly);
        assert!(case.body().unwrap().is_none());
    }

    #[test]
    fn test_strict_policy_reports_every_unresolved_token() {
        let mut web = WebTest::new(1).unwrap();
        web.bag_mut().insert("customerId", "c-1");

        let payload = Payload::from_value(json!({
            "customer_id": ":customerId",
            "items": [{"product_id": ":productId"}],
            "active": true,
        }))
        .unwrap();
        let err = web
            .ensure_resolved(
                "order/:orderId",
                &payload,
                &Expectation::Pattern(r#""id":":orderId""#.to_string()),
            )
            .unwrap_err();

        match err {
            WebTestError::UnresolvedPlaceholder { names } => {
                assert_eq!(names, ["orderId", "productId"]);
            }
            other => panic!("expected unresolved placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_base_url() {
        let web = WebTest::new(8080).unwrap();
        assert_eq!(web.base_url(), "http://localhost:8080/");

        let web = web.with_base_url("http://127.0.0.1:9000");
        assert_eq!(web.base_url(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_free_port_is_bindable() {
        let port = free_port().unwrap();
        assert_ne!(port, 0);
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn test_random_name_shape() {
        let name = random_name();
        let nanos = name.strip_prefix("name-").unwrap();
        assert!(nanos.parse::<u128>().is_ok());
    }

    #[test]
    fn test_mismatch_display() {
        let mismatch = Mismatch::Status {
            expected: StatusCode::CREATED,
            actual: StatusCode::BAD_REQUEST,
        };
        assert_eq!(
            mismatch.to_string(),
            "expected status 201 Created, got 400 Bad Request"
        );
    }
}
