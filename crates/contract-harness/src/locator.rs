//! Resource Locator: derive the address of a created resource.

use crate::client::{HttpClient, ResponseSnapshot};
use crate::error::TestError;
use crate::pending::Pending;
use reqwest::header::LOCATION;
use reqwest::Url;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Identifier field used when none is configured.
pub const DEFAULT_ID_FIELD: &str = "uuid";

/// Full URL of one resource instance.
///
/// Only the locator constructs references, and only after the creating request has
/// settled, so a reference always points at a resource that exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference(String);

impl ResourceReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addressing strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Re-read the collection and append the first element's identifier to its URL.
    IdentifierInList { id_field: String },

    /// Use the creation response's `Location` header.
    LocationHeader,
}

impl Locator {
    /// Choose by which signal the creation response carries.
    pub fn detect(created: &ResponseSnapshot, id_field: &str) -> Self {
        if created.header(LOCATION.as_str()).is_some() {
            Locator::LocationHeader
        } else {
            Locator::IdentifierInList {
                id_field: id_field.to_string(),
            }
        }
    }

    /// Locate the resource created by `created`.
    ///
    /// Settles `created` first. The identifier-in-list strategy takes the first element
    /// of the collection, so the collection must have been emptied beforehand.
    pub async fn locate(
        &self,
        client: &HttpClient,
        created: &Pending,
        collection_url: &str,
    ) -> Result<ResourceReference, TestError> {
        let snapshot = created.settle().await?;

        let reference = match self {
            Locator::IdentifierInList { id_field } => {
                let listing = client.read(collection_url).settle().await?;
                reference_from_listing(&listing, collection_url, id_field)?
            }
            Locator::LocationHeader => reference_from_location(&snapshot, collection_url)?,
        };

        debug!(strategy = %self, reference = %reference, "Located resource");
        Ok(reference)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::IdentifierInList { id_field } => write!(f, "identifier-in-list({})", id_field),
            Locator::LocationHeader => f.write_str("location-header"),
        }
    }
}

fn reference_from_listing(
    listing: &ResponseSnapshot,
    collection_url: &str,
    id_field: &str,
) -> Result<ResourceReference, TestError> {
    let first = match &listing.body {
        Some(Value::Array(items)) => items
            .first()
            .ok_or_else(|| TestError::Locate("collection is empty".to_string()))?,
        other => {
            return Err(TestError::Locate(format!(
                "collection body is not an array: {}",
                render(other.as_ref())
            )))
        }
    };

    let id = match first.get(id_field) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        other => {
            return Err(TestError::Locate(format!(
                "first element has no usable {:?} field: {}",
                id_field,
                render(other)
            )))
        }
    };

    Ok(ResourceReference(format!(
        "{}/{}",
        collection_url.trim_end_matches('/'),
        id
    )))
}

fn reference_from_location(
    created: &ResponseSnapshot,
    collection_url: &str,
) -> Result<ResourceReference, TestError> {
    let location = created
        .header(LOCATION.as_str())
        .ok_or_else(|| TestError::Locate("creation response has no location header".to_string()))?;

    let base = Url::parse(collection_url)
        .map_err(|e| TestError::Locate(format!("invalid collection URL {}: {}", collection_url, e)))?;
    let resolved = base
        .join(location)
        .map_err(|e| TestError::Locate(format!("invalid location {:?}: {}", location, e)))?;

    Ok(ResourceReference(resolved.to_string()))
}

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_string(), Value::to_string)
}
