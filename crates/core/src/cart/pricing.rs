use rust_decimal::Decimal;
use tracing::debug;

use crate::cart::CartLines;
use crate::domain::product::Product;
use crate::errors::DomainError;

/// Sum of `price * quantity` over every line whose product is present in
/// `products`. Lines without a product contribute nothing.
pub fn cart_total(lines: &CartLines, products: &[Product]) -> Result<Decimal, DomainError> {
    let mut total = Decimal::ZERO;
    for (product_id, quantity) in lines {
        match products.iter().find(|product| product.id == *product_id) {
            Some(product) => {
                total = product
                    .price
                    .checked_mul(Decimal::from(*quantity))
                    .and_then(|line| total.checked_add(line))
                    .ok_or(DomainError::TotalOverflow { product_id: *product_id })?;
            }
            None => debug!(
                event_name = "cart.total.stale_entry",
                product_id = %product_id,
                "cart entry has no catalog product; skipped"
            ),
        }
    }
    Ok(total)
}
