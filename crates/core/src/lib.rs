pub mod cart;
pub mod config;
pub mod domain;
pub mod errors;

pub use cart::catalog::{Catalog, ProductCatalog};
pub use cart::{Cart, CartLines, CartSummary, Quantity, CART_SESSION_KEY};
pub use config::SessionConcurrency;
pub use domain::product::{Category, CategoryId, Product, ProductId};
pub use domain::session::{Session, SessionId};
pub use errors::{ApplicationError, ConversionError, DomainError, InterfaceError};
