use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{ConversionError, DomainError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = ConversionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| ConversionError::ProductId { value: value.to_string() })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: CategoryId, name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::EmptyCategoryName);
        }
        Ok(Self { id, name })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: Option<CategoryId>,
    pub is_sale: bool,
    pub sale_price: Option<Decimal>,
}

impl Product {
    /// Minimal product with only the fields the cart reads.
    pub fn priced(id: i64, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: ProductId(id),
            name: name.into(),
            description: String::new(),
            price,
            category_id: None,
            is_sale: false,
            sale_price: None,
        }
    }
}
