//! Domain types for the coffee catalog: stored records, request schemas and
//! the price coercion rules shared by create, update and list.

pub mod errors;
pub mod coffee;
pub mod price;
pub mod request;

pub use configs::FieldPolicy;
