//! Literal payloads used to seed the collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Geographic location of a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: String,
    pub address: String,
}

/// A restaurant record as posted to the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub restaurant_name: String,
    pub restaurant_type: String,
    pub phone: String,
    pub location: Location,
}

impl NewRestaurant {
    /// The canonical seed record.
    pub fn hudson() -> Self {
        Self {
            restaurant_name: "Hudson".to_string(),
            restaurant_type: "Grill".to_string(),
            phone: "+(972) 3644 4733".to_string(),
            location: Location {
                coordinates: "32.109805/34.840232".to_string(),
                address: "HaBarzel St 27, Tel Aviv-Yafo, Israel".to_string(),
            },
        }
    }
}

/// Field changed by the full-replace update scenario.
pub const PUT_FIELD: (&str, &str) = ("restaurant_type", "Burger");

/// Field changed by the partial-update scenario.
pub const PATCH_FIELD: (&str, &str) = ("phone", "(+972) 050 - 4945555");

/// Single-field update body, e.g. `{"phone": "..."}`.
pub fn field_update((field, value): (&str, &str)) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(field.to_string(), Value::String(value.to_string()));
    Value::Object(body)
}
