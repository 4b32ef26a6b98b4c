use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::price::normalize_price;

/// A stored record: a flat map of field name to JSON value.
pub type Record = Map<String, Value>;

/// User-supplied coffee fields, in the order error messages list them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Price,
    ImageUrl,
    Description,
    Category,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Price,
        Field::ImageUrl,
        Field::Description,
        Field::Category,
    ];

    /// Wire and storage name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Price => "price",
            Field::ImageUrl => "imageUrl",
            Field::Description => "description",
            Field::Category => "category",
        }
    }
}

pub const ID: &str = "id";
pub const UPDATED_AT: &str = "updatedAt";

/// A fully validated coffee ready to be written under a freshly generated key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoffee {
    pub name: String,
    pub price: f64,
    pub image_url: String,
    pub description: String,
    pub category: String,
}

impl NewCoffee {
    /// Build the stored record; `id` repeats the store key.
    pub fn into_record(self, id: &str) -> Record {
        let mut record = Record::new();
        record.insert(ID.into(), Value::String(id.to_string()));
        record.insert(Field::Name.as_str().into(), Value::String(self.name));
        record.insert(Field::Price.as_str().into(), price_value(self.price));
        record.insert(Field::ImageUrl.as_str().into(), Value::String(self.image_url));
        record.insert(Field::Description.as_str().into(), Value::String(self.description));
        record.insert(Field::Category.as_str().into(), Value::String(self.category));
        record
    }
}

/// Fields to merge into an existing record. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoffeePatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

impl CoffeePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.description.is_none()
            && self.category.is_none()
    }

    /// Fields this patch will write, excluding `updatedAt`.
    pub fn fields(&self) -> Vec<Field> {
        let mut out = Vec::new();
        if self.name.is_some() { out.push(Field::Name); }
        if self.price.is_some() { out.push(Field::Price); }
        if self.image_url.is_some() { out.push(Field::ImageUrl); }
        if self.description.is_some() { out.push(Field::Description); }
        if self.category.is_some() { out.push(Field::Category); }
        out
    }

    /// Partial record for a merge write, stamped with `updatedAt`.
    pub fn into_partial(self, updated_at: DateTime<Utc>) -> Record {
        let mut record = Record::new();
        if let Some(name) = self.name {
            record.insert(Field::Name.as_str().into(), Value::String(name));
        }
        if let Some(price) = self.price {
            record.insert(Field::Price.as_str().into(), price_value(price));
        }
        if let Some(image_url) = self.image_url {
            record.insert(Field::ImageUrl.as_str().into(), Value::String(image_url));
        }
        if let Some(description) = self.description {
            record.insert(Field::Description.as_str().into(), Value::String(description));
        }
        if let Some(category) = self.category {
            record.insert(Field::Category.as_str().into(), Value::String(category));
        }
        record.insert(UPDATED_AT.into(), Value::String(format_timestamp(updated_at)));
        record
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2024-03-01T10:15:30.125Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A stored record as returned by list: every stored field passes through and
/// `price` is re-read as a number.
pub fn for_listing(mut record: Record) -> Record {
    let price = record
        .get(Field::Price.as_str())
        .map(normalize_price)
        .unwrap_or(Value::Null);
    record.insert(Field::Price.as_str().into(), price);
    record
}

fn price_value(price: f64) -> Value {
    serde_json::Number::from_f64(price)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
