//! Expectation Engine: assertions on values that resolve in the future.
//!
//! An assertion settles its [`Pending`], extracts the requested [`Facet`] as JSON,
//! optionally narrows it with a JSON pointer, and compares. Nothing is retried.
//!
//! ```no_run
//! use contract_harness::expect::{expect_eventually, expect_rejection, Facet};
//! # async fn example(created: contract_harness::pending::Pending, gone: contract_harness::pending::Pending)
//! # -> contract_harness::error::StepResult {
//! expect_eventually(&created, Facet::Status).to_equal(201).await?;
//! expect_rejection(&gone).with_reason_containing("Not Found").await
//! # }
//! ```

use crate::error::{Failure, StepResult, TestError};
use crate::pending::Pending;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Part of a response an assertion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Status,
    Headers,
    Body,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Facet::Status => "status",
            Facet::Headers => "headers",
            Facet::Body => "body",
        })
    }
}

/// Assert on a facet of the eventual fulfillment of `pending`.
pub fn expect_eventually(pending: &Pending, facet: Facet) -> Eventually {
    Eventually {
        pending: pending.clone(),
        facet,
        pointer: None,
    }
}

/// Assert that `pending` eventually rejects.
pub fn expect_rejection(pending: &Pending) -> Rejection {
    Rejection {
        pending: pending.clone(),
    }
}

/// Pending assertion on a fulfilled facet.
#[derive(Debug, Clone)]
pub struct Eventually {
    pending: Pending,
    facet: Facet,
    pointer: Option<String>,
}

impl Eventually {
    /// Narrow the facet to the value at a JSON pointer, e.g. `"/0"`.
    pub fn at(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    pub async fn to_equal(self, expected: impl Into<Value>) -> StepResult {
        let expected = expected.into();
        let (subject, actual) = self.resolve().await?;
        check_equal(&subject, &actual, &expected)
    }

    /// The facet is an object containing every key in `keys`.
    pub async fn to_contain_keys<I, S>(self, keys: I) -> StepResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        let (subject, actual) = self.resolve().await?;
        check_contains_keys(&subject, &actual, &keys)
    }

    /// The facet has property `key` equal to `expected`.
    pub async fn to_have_property(self, key: &str, expected: impl Into<Value>) -> StepResult {
        let expected = expected.into();
        let (subject, actual) = self.resolve().await?;
        check_property(&subject, &actual, key, &expected)
    }

    /// The facet, rendered as text, matches `pattern`.
    pub async fn to_match(self, pattern: &str) -> StepResult {
        let regex = Regex::new(pattern)?;
        let (subject, actual) = self.resolve().await?;
        check_match(&subject, &actual, &regex)
    }

    /// The facet is an array, object or string of length `expected`.
    pub async fn to_have_length(self, expected: usize) -> StepResult {
        let (subject, actual) = self.resolve().await?;
        check_length(&subject, &actual, expected)
    }

    /// Every field of `subset` is present in the facet with an equal value.
    pub async fn to_include<T: Serialize + ?Sized>(self, subset: &T) -> StepResult {
        let subset = serde_json::to_value(subset)
            .map_err(|e| Failure::decode(format!("expected value is not serializable: {}", e)))?;
        let (subject, actual) = self.resolve().await?;
        check_includes(&subject, &actual, &subset)
    }

    async fn resolve(&self) -> Result<(String, Value), TestError> {
        let snapshot = self.pending.settle().await?;

        let whole = match self.facet {
            Facet::Status => Value::from(snapshot.status),
            Facet::Headers => snapshot.headers_value(),
            Facet::Body => snapshot.body.clone().unwrap_or(Value::Null),
        };

        match &self.pointer {
            None => Ok((self.facet.to_string(), whole)),
            Some(pointer) => {
                let subject = format!("{}{}", self.facet, pointer);
                match whole.pointer(pointer) {
                    Some(value) => Ok((subject, value.clone())),
                    None => Err(TestError::Mismatch {
                        subject,
                        expectation: "to exist".to_string(),
                        actual: format!("{} was {}", self.facet, whole),
                    }),
                }
            }
        }
    }
}

/// Pending assertion that a request rejects.
#[derive(Debug, Clone)]
pub struct Rejection {
    pending: Pending,
}

impl Rejection {
    /// The rejection reason contains `needle`.
    pub async fn with_reason_containing(self, needle: &str) -> StepResult {
        match self.pending.settle().await {
            Ok(snapshot) => Err(TestError::UnexpectedFulfillment {
                status: snapshot.status,
                expected: needle.to_string(),
            }),
            Err(failure) if failure.reason.contains(needle) => Ok(()),
            Err(failure) => Err(TestError::Mismatch {
                subject: "rejection reason".to_string(),
                expectation: format!("to contain {:?}", needle),
                actual: format!("{:?}", failure.reason),
            }),
        }
    }
}

fn mismatch(subject: &str, expectation: String, actual: &Value) -> TestError {
    TestError::Mismatch {
        subject: subject.to_string(),
        expectation,
        actual: actual.to_string(),
    }
}

fn check_equal(subject: &str, actual: &Value, expected: &Value) -> StepResult {
    if actual == expected {
        Ok(())
    } else {
        Err(mismatch(subject, format!("to equal {}", expected), actual))
    }
}

fn check_contains_keys(subject: &str, actual: &Value, keys: &[String]) -> StepResult {
    let Some(object) = actual.as_object() else {
        return Err(mismatch(subject, "to be an object".to_string(), actual));
    };

    let missing: Vec<&str> = keys
        .iter()
        .filter(|k| !object.contains_key(k.as_str()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        let present: Vec<&String> = object.keys().collect();
        Err(TestError::Mismatch {
            subject: subject.to_string(),
            expectation: format!("to contain keys {:?}", keys),
            actual: format!("keys {:?} (missing {:?})", present, missing),
        })
    }
}

fn check_property(subject: &str, actual: &Value, key: &str, expected: &Value) -> StepResult {
    match actual.get(key) {
        Some(value) if value == expected => Ok(()),
        Some(value) => Err(mismatch(
            &format!("{}.{}", subject, key),
            format!("to equal {}", expected),
            value,
        )),
        None => Err(mismatch(
            subject,
            format!("to have property {:?}", key),
            actual,
        )),
    }
}

fn check_match(subject: &str, actual: &Value, regex: &Regex) -> StepResult {
    let text = match actual {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if regex.is_match(&text) {
        Ok(())
    } else {
        Err(mismatch(subject, format!("to match /{}/", regex), actual))
    }
}

fn check_length(subject: &str, actual: &Value, expected: usize) -> StepResult {
    let length = match actual {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        other => {
            return Err(mismatch(
                subject,
                format!("to have length {}", expected),
                other,
            ))
        }
    };

    if length == expected {
        Ok(())
    } else {
        Err(TestError::Mismatch {
            subject: subject.to_string(),
            expectation: format!("to have length {}", expected),
            actual: format!("length {}", length),
        })
    }
}

fn check_includes(subject: &str, actual: &Value, subset: &Value) -> StepResult {
    let (Some(object), Some(wanted)) = (actual.as_object(), subset.as_object()) else {
        return Err(mismatch(
            subject,
            format!("to be an object including {}", subset),
            actual,
        ));
    };

    for (key, expected) in wanted {
        match object.get(key) {
            Some(value) if value == expected => {}
            Some(value) => {
                return Err(mismatch(
                    &format!("{}.{}", subject, key),
                    format!("to equal {}", expected),
                    value,
                ))
            }
            None => {
                return Err(mismatch(
                    subject,
                    format!("to have property {:?}", key),
                    actual,
                ))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::client::ResponseSnapshot;
    use crate::fixtures::NewRestaurant;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn fulfilled(status: u16, headers: &[(&str, &str)], body: Option<Value>) -> Pending {
        let headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Pending::fulfilled(
            "test",
            ResponseSnapshot {
                status,
                headers,
                body,
            },
        )
    }

    fn cors_response() -> Pending {
        fulfilled(
            204,
            &[
                ("access-control-allow-origin", "*"),
                ("access-control-allow-methods", "GET,POST,PUT,PATCH,DELETE"),
                ("access-control-allow-headers", "Content-Type"),
            ],
            None,
        )
    }

    #[tokio::test]
    async fn test_status_equality() {
        let pending = fulfilled(201, &[], None);
        expect_eventually(&pending, Facet::Status)
            .to_equal(201)
            .await
            .unwrap();

        let err = expect_eventually(&pending, Facet::Status)
            .to_equal(200)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "expected status to equal 200, got 201");
    }

    #[tokio::test]
    async fn test_header_keys_and_property() {
        let pending = cors_response();

        expect_eventually(&pending, Facet::Headers)
            .to_contain_keys([
                "access-control-allow-origin",
                "access-control-allow-methods",
                "access-control-allow-headers",
            ])
            .await
            .unwrap();

        expect_eventually(&pending, Facet::Headers)
            .to_have_property("access-control-allow-origin", "*")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_header_keys_are_reported() {
        let pending = fulfilled(204, &[("access-control-allow-origin", "*")], None);

        let err = expect_eventually(&pending, Facet::Headers)
            .to_contain_keys(["access-control-allow-origin", "access-control-allow-methods"])
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("missing [\"access-control-allow-methods\"]"), "{}", message);
    }

    #[tokio::test]
    async fn test_pointer_into_body() {
        let pending = fulfilled(200, &[], Some(json!([{"restaurant_name": "Hudson"}])));

        expect_eventually(&pending, Facet::Body)
            .at("/0")
            .to_have_property("restaurant_name", "Hudson")
            .await
            .unwrap();

        let err = expect_eventually(&pending, Facet::Body)
            .at("/1")
            .to_have_property("restaurant_name", "Hudson")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("expected body/1 to exist"));
    }

    #[tokio::test]
    async fn test_property_mismatch_names_field() {
        let pending = fulfilled(200, &[], Some(json!({"restaurant_type": "Grill"})));

        let err = expect_eventually(&pending, Facet::Body)
            .to_have_property("restaurant_type", "Burger")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected body.restaurant_type to equal \"Burger\", got \"Grill\""
        );
    }

    #[tokio::test]
    async fn test_length_of_empty_collection() {
        let pending = fulfilled(200, &[], Some(json!([])));
        expect_eventually(&pending, Facet::Body)
            .to_have_length(0)
            .await
            .unwrap();

        let pending = fulfilled(200, &[], Some(json!([{}, {}])));
        let err = expect_eventually(&pending, Facet::Body)
            .to_have_length(0)
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("got length 2"));
    }

    #[tokio::test]
    async fn test_regex_match() {
        let pending = fulfilled(200, &[("content-type", "application/json; charset=utf-8")], None);

        expect_eventually(&pending, Facet::Headers)
            .at("/content-type")
            .to_match("^application/json")
            .await
            .unwrap();

        let err = expect_eventually(&pending, Facet::Headers)
            .to_match("(")
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidPattern(_)));
    }

    #[tokio::test]
    async fn test_include_compares_nested_fields() {
        let pending = fulfilled(
            200,
            &[],
            Some(json!({"uuid": "1", "name": "Hudson", "location": {"address": "x"}})),
        );

        expect_eventually(&pending, Facet::Body)
            .to_include(&json!({"name": "Hudson", "location": {"address": "x"}}))
            .await
            .unwrap();

        let err = expect_eventually(&pending, Facet::Body)
            .to_include(&json!({"location": {"address": "y"}}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("expected body.location to equal"));
    }

    #[tokio::test]
    async fn test_include_accepts_serializable_records() {
        let hudson = NewRestaurant::hudson();
        let mut stored = serde_json::to_value(&hudson).unwrap();
        stored["uuid"] = json!("42");
        let pending = fulfilled(200, &[], Some(stored));

        expect_eventually(&pending, Facet::Body)
            .to_include(&hudson)
            .await
            .unwrap();

        let renamed = NewRestaurant {
            restaurant_name: "Elsewhere".to_string(),
            ..NewRestaurant::hudson()
        };
        let err = expect_eventually(&pending, Facet::Body)
            .to_include(&renamed)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("expected body.restaurant_name to equal"));
    }

    #[tokio::test]
    async fn test_fulfilled_facet_on_rejected_pending() {
        let pending = Pending::rejected("GET", Failure::decode("boom"));

        let err = expect_eventually(&pending, Facet::Status)
            .to_equal(200)
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_rejection_reason_matching() {
        let not_found = Failure::status(ResponseSnapshot {
            status: 404,
            headers: BTreeMap::new(),
            body: None,
        });
        let pending = Pending::rejected("GET", not_found);

        expect_rejection(&pending)
            .with_reason_containing("Not Found")
            .await
            .unwrap();

        let err = expect_rejection(&pending)
            .with_reason_containing("Gone")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejection reason"));
    }

    #[tokio::test]
    async fn test_rejection_expected_but_fulfilled() {
        let pending = fulfilled(200, &[], Some(json!({})));

        let err = expect_rejection(&pending)
            .with_reason_containing("Not Found")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TestError::UnexpectedFulfillment { status: 200, .. }
        ));
    }
}
