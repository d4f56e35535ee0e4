//! Product catalog metadata.

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::value_objects::{Money, ProductId};

/// A menu item as known to the product catalog.
///
/// The catalog is the source of truth for prices and preparation times:
/// cart lines are re-priced from it whenever a cart is hydrated from the
/// store, never from a client-cached copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// The product identifier.
    pub id: ProductId,

    /// Human-readable product name.
    pub name: String,

    /// Current unit price.
    pub unit_price: Money,

    /// Reference to the product image, if any.
    pub image: Option<String>,

    /// Minutes this item takes to prepare, if known.
    pub prep_time_minutes: Option<i64>,
}

impl Product {
    /// Creates a new product.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        prep_time_minutes: Option<i64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            image: None,
            prep_time_minutes,
        }
    }

    /// Sets the image reference.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Builds a cart line for this product at the catalog's current price.
    pub fn cart_line(&self, quantity: u32) -> CartLine {
        CartLine {
            product_id: self.id.clone(),
            name: self.name.clone(),
            unit_price: self.unit_price,
            quantity,
            prep_time_minutes: self.prep_time_minutes,
            image: self.image.clone(),
        }
    }
}
