//! Request bodies for create and update.
//!
//! Each body has a fixed shape: unknown keys and wrongly typed values fail to
//! deserialize. A key that is missing or `null` is absent; whether a present
//! value counts as supplied is decided by the [`FieldPolicy`].

use serde::{Deserialize, Serialize};

use crate::coffee::{CoffeePatch, Field, NewCoffee};
use crate::errors::ModelError;
use crate::price::PriceInput;
use crate::FieldPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCoffeeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<PriceInput>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCoffeeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<PriceInput>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Update fields after the policy has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpdate {
    pub patch: CoffeePatch,
    /// Fields present in the body but not applied under the truthy policy.
    pub dropped: Vec<Field>,
}

fn text_counts(value: &str, policy: FieldPolicy) -> bool {
    match policy {
        FieldPolicy::Truthy => !value.is_empty(),
        FieldPolicy::Presence => true,
    }
}

fn price_counts(value: &PriceInput, policy: FieldPolicy) -> bool {
    match policy {
        FieldPolicy::Truthy => value.is_truthy(),
        FieldPolicy::Presence => !matches!(value, PriceInput::Text(s) if s.is_empty()),
    }
}

/// Keep a text value if it counts; record it as dropped otherwise.
fn take_text(
    value: Option<String>,
    field: Field,
    policy: FieldPolicy,
    dropped: &mut Vec<Field>,
) -> Option<String> {
    match value {
        Some(v) if text_counts(&v, policy) => Some(v),
        Some(_) => {
            dropped.push(field);
            None
        }
        None => None,
    }
}

impl CreateCoffeeRequest {
    /// Check that all five fields are supplied and coerce the price.
    ///
    /// Text fields must be non-empty under either policy; under `Presence` a
    /// price of zero is accepted.
    pub fn validate(self, policy: FieldPolicy) -> Result<NewCoffee, ModelError> {
        let mut missing = Vec::new();
        let name = required_text(self.name, Field::Name, &mut missing);
        let price = match self.price {
            Some(p) if price_counts(&p, policy) => Some(p),
            _ => {
                missing.push(Field::Price.as_str());
                None
            }
        };
        let image_url = required_text(self.image_url, Field::ImageUrl, &mut missing);
        let description = required_text(self.description, Field::Description, &mut missing);
        let category = required_text(self.category, Field::Category, &mut missing);

        match (name, price, image_url, description, category) {
            (Some(name), Some(price), Some(image_url), Some(description), Some(category)) => {
                Ok(NewCoffee { name, price: price.coerce()?, image_url, description, category })
            }
            _ => Err(ModelError::MissingFields(missing)),
        }
    }
}

fn required_text(value: Option<String>, field: Field, missing: &mut Vec<&'static str>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(field.as_str());
            None
        }
    }
}

impl UpdateCoffeeRequest {
    /// Apply the policy, coerce the price and require at least one field.
    pub fn validate(self, policy: FieldPolicy) -> Result<ValidatedUpdate, ModelError> {
        let mut dropped = Vec::new();
        let name = take_text(self.name, Field::Name, policy, &mut dropped);
        let price = match self.price {
            Some(p) if price_counts(&p, policy) => Some(p.coerce()?),
            Some(_) => {
                dropped.push(Field::Price);
                None
            }
            None => None,
        };
        let image_url = take_text(self.image_url, Field::ImageUrl, policy, &mut dropped);
        let description = take_text(self.description, Field::Description, policy, &mut dropped);
        let category = take_text(self.category, Field::Category, policy, &mut dropped);

        let patch = CoffeePatch { name, price, image_url, description, category };
        if patch.is_empty() {
            return Err(ModelError::NothingToUpdate);
        }
        Ok(ValidatedUpdate { patch, dropped })
    }
}
