use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("all fields are required (missing: {})", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("price must be a number, got `{0}`")]
    InvalidPrice(String),
    #[error("no data to update")]
    NothingToUpdate,
}
