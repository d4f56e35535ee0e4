//! Cart aggregate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::{Money, ProductId};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be at least 1.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// Unit price may not be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },

    /// No line exists for the given product.
    #[error("No cart line for product: {product_id}")]
    LineNotFound { product_id: String },
}

/// A single line in a cart: a product and how many of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product identifier.
    pub product_id: ProductId,

    /// Human-readable product name.
    pub name: String,

    /// Price per unit at hydration time.
    pub unit_price: Money,

    /// Quantity in the cart, always at least 1.
    pub quantity: u32,

    /// Minutes this item takes to prepare, if known.
    pub prep_time_minutes: Option<i64>,

    /// Reference to the product image, if any.
    pub image: Option<String>,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            prep_time_minutes: None,
            image: None,
        }
    }

    /// Sets the preparation time.
    pub fn with_prep_time(mut self, minutes: i64) -> Self {
        self.prep_time_minutes = Some(minutes);
        self
    }

    /// Returns the subtotal for this line (unit_price * quantity).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// In-memory cart aggregate, unique by product ID.
///
/// All operations mutate local state only; persistence synchronization is
/// the cart service's concern in the `checkout` crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: HashMap<ProductId, CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from hydrated lines, merging duplicates by product.
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.lines.get_mut(&line.product_id) {
                Some(existing) => existing.quantity += line.quantity,
                None => {
                    cart.lines.insert(line.product_id.clone(), line);
                }
            }
        }
        cart
    }

    /// Adds a line to the cart.
    ///
    /// If a line for the product already exists, its quantity is increased
    /// by the new line's quantity instead.
    pub fn add_item(&mut self, line: CartLine) -> Result<(), CartError> {
        if line.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                quantity: line.quantity,
            });
        }
        if line.unit_price.is_negative() {
            return Err(CartError::InvalidPrice {
                price: line.unit_price.cents(),
            });
        }

        match self.lines.get_mut(&line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => {
                self.lines.insert(line.product_id.clone(), line);
            }
        }
        Ok(())
    }

    /// Removes the line for a product.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<CartLine, CartError> {
        self.lines
            .remove(product_id)
            .ok_or_else(|| CartError::LineNotFound {
                product_id: product_id.to_string(),
            })
    }

    /// Increases a line's quantity by one.
    pub fn increase_qty(&mut self, product_id: &ProductId) -> Result<u32, CartError> {
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::LineNotFound {
                product_id: product_id.to_string(),
            })?;
        line.quantity += 1;
        Ok(line.quantity)
    }

    /// Decreases a line's quantity by one, floored at 1.
    ///
    /// Decreasing never removes a line; use [`Cart::remove_item`] for that.
    pub fn decrease_qty(&mut self, product_id: &ProductId) -> Result<u32, CartError> {
        let line = self
            .lines
            .get_mut(product_id)
            .ok_or_else(|| CartError::LineNotFound {
                product_id: product_id.to_string(),
            })?;
        if line.quantity > 1 {
            line.quantity -= 1;
        }
        Ok(line.quantity)
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Returns all lines in the cart.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    /// Returns the line for a product, if present.
    pub fn get_line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.get(product_id)
    }

    /// Returns the quantity for a product, if present.
    pub fn quantity(&self, product_id: &ProductId) -> Option<u32> {
        self.lines.get(product_id).map(|l| l.quantity)
    }

    /// Returns the number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.values().map(|l| l.quantity).sum()
    }

    /// Returns the cart total.
    pub fn total(&self) -> Money {
        self.lines.values().map(|l| l.subtotal()).sum()
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
