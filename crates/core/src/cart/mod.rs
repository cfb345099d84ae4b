//! Session-backed shopping cart.
//!
//! The cart is a request-scoped view over one entry of a [`Session`]: a map
//! from product id to quantity stored under [`CART_SESSION_KEY`] with the wire
//! shape `{"<id>": <qty>}`. Every mutation is written back into the session
//! and marks it modified; persisting the session is left to the caller.

pub mod catalog;
pub mod pricing;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::product::{Product, ProductId};
use crate::domain::session::Session;
use crate::errors::{ApplicationError, ConversionError};

use self::{catalog::ProductCatalog, pricing::cart_total};

pub const CART_SESSION_KEY: &str = "session_key";

pub type Quantity = u32;
pub type CartLines = BTreeMap<ProductId, Quantity>;

pub fn parse_quantity(value: &str) -> Result<Quantity, ConversionError> {
    value
        .trim()
        .parse::<Quantity>()
        .map_err(|_| ConversionError::Quantity { value: value.to_string() })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartSummary {
    pub products: Vec<Product>,
    pub quantities: CartLines,
    pub total: Decimal,
}

pub struct Cart<'s> {
    session: &'s mut Session,
    lines: CartLines,
}

impl<'s> Cart<'s> {
    /// Reads the cart out of `session`, initializing an empty one when the
    /// session has none yet.
    pub fn attach(session: &'s mut Session) -> Result<Self, ConversionError> {
        let lines = match session.get(CART_SESSION_KEY) {
            Some(value) => decode_lines(value)?,
            None => {
                session.set(CART_SESSION_KEY, Value::Object(Map::new()));
                session.mark_modified();
                CartLines::new()
            }
        };

        Ok(Self { session, lines })
    }

    /// Inserts `product` only if it is not in the cart yet. A repeated add
    /// keeps the first quantity.
    pub fn add(&mut self, product: &Product, quantity: Quantity) {
        if self.lines.contains_key(&product.id) {
            debug!(
                event_name = "cart.add.ignored",
                session_id = %self.session.id(),
                product_id = %product.id,
                "product already in cart; quantity left unchanged"
            );
        } else {
            self.lines.insert(product.id, quantity);
        }
        self.write_back();
    }

    pub fn update(&mut self, product_id: ProductId, quantity: Quantity) -> &CartLines {
        self.lines.insert(product_id, quantity);
        self.write_back();
        &self.lines
    }

    pub fn update_raw(
        &mut self,
        product_id: &str,
        quantity: &str,
    ) -> Result<&CartLines, ConversionError> {
        let product_id = product_id.parse::<ProductId>()?;
        let quantity = parse_quantity(quantity)?;
        Ok(self.update(product_id, quantity))
    }

    pub fn remove(&mut self, product_id: ProductId) -> Option<Quantity> {
        let removed = self.lines.remove(&product_id);
        self.write_back();
        removed
    }

    /// Number of distinct products, not the sum of quantities.
    pub fn size(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn list_quantities(&self) -> &CartLines {
        &self.lines
    }

    pub async fn list_products<C>(&self, catalog: &C) -> Result<Vec<Product>, ApplicationError>
    where
        C: ProductCatalog + ?Sized,
    {
        if self.lines.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.lines.keys().copied().collect::<Vec<_>>();
        catalog.find_by_ids(&ids).await
    }

    pub async fn total<C>(&self, catalog: &C) -> Result<Decimal, ApplicationError>
    where
        C: ProductCatalog + ?Sized,
    {
        let products = self.list_products(catalog).await?;
        Ok(cart_total(&self.lines, &products)?)
    }

    /// Products, quantities and total from a single catalog lookup.
    pub async fn summary<C>(&self, catalog: &C) -> Result<CartSummary, ApplicationError>
    where
        C: ProductCatalog + ?Sized,
    {
        let products = self.list_products(catalog).await?;
        let total = cart_total(&self.lines, &products)?;
        Ok(CartSummary { products, quantities: self.lines.clone(), total })
    }

    fn write_back(&mut self) {
        self.session.set(CART_SESSION_KEY, encode_lines(&self.lines));
        self.session.mark_modified();
    }
}

fn encode_lines(lines: &CartLines) -> Value {
    let map = lines
        .iter()
        .map(|(product_id, quantity)| (product_id.to_string(), Value::from(*quantity)))
        .collect::<Map<_, _>>();
    Value::Object(map)
}

fn decode_lines(value: &Value) -> Result<CartLines, ConversionError> {
    let map = value
        .as_object()
        .ok_or_else(|| ConversionError::Payload(format!("expected an object, found {value}")))?;

    map.iter()
        .map(|(key, quantity)| {
            let product_id = key.parse::<ProductId>()?;
            let quantity = quantity
                .as_u64()
                .and_then(|raw| Quantity::try_from(raw).ok())
                .ok_or_else(|| ConversionError::Quantity { value: quantity.to_string() })?;
            Ok::<_, ConversionError>((product_id, quantity))
        })
        .collect()
}
