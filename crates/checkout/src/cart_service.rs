//! Cart service: hydration from the store and persistence sync.

use common::{CartId, UserId};
use domain::{Cart, ProductId};
use store::{CartStore, ProductCatalog, StoreError};

use crate::error::CheckoutError;

/// A cart hydrated from the store, paired with its persisted cart id.
#[derive(Debug, Clone)]
pub struct HydratedCart {
    /// The store-assigned cart row id.
    pub cart_id: CartId,

    /// The in-memory cart aggregate.
    pub cart: Cart,
}

/// Loads carts for a user and mirrors mutations to the persisted cart.
///
/// The aggregate operations themselves stay pure; this service adds the
/// store round-trips so a cart survives process restarts.
pub struct CartService<S> {
    store: S,
}

impl<S: CartStore + ProductCatalog> CartService<S> {
    /// Creates a new cart service.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetches or lazily creates the user's persisted cart and hydrates
    /// its lines from the product catalog.
    ///
    /// Prices are re-read from the catalog here, never trusted from a
    /// client-cached copy.
    #[tracing::instrument(skip(self))]
    pub async fn load_for_user(&self, user_id: UserId) -> Result<HydratedCart, CheckoutError> {
        let cart_id = self.store.ensure_cart(user_id).await?;
        let lines = self.store.cart_lines(cart_id).await?;
        Ok(HydratedCart {
            cart_id,
            cart: Cart::from_lines(lines),
        })
    }

    /// Adds a product to the cart at the catalog's current price.
    #[tracing::instrument(skip(self, hydrated))]
    pub async fn add_item(
        &self,
        hydrated: &mut HydratedCart,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CheckoutError> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| StoreError::UnknownProduct(product_id.to_string()))?;

        hydrated.cart.add_item(product.cart_line(quantity))?;
        self.sync_line(hydrated, product_id).await
    }

    /// Removes a product from the cart.
    ///
    /// Local removal happens first and stands even if the remote delete
    /// fails; the store error is surfaced so the caller can retry rather
    /// than silently desync.
    #[tracing::instrument(skip(self, hydrated))]
    pub async fn remove_item(
        &self,
        hydrated: &mut HydratedCart,
        product_id: &ProductId,
    ) -> Result<(), CheckoutError> {
        hydrated.cart.remove_item(product_id)?;
        self.store
            .delete_cart_line(hydrated.cart_id, product_id)
            .await?;
        Ok(())
    }

    /// Increases a line's quantity by one.
    pub async fn increase_qty(
        &self,
        hydrated: &mut HydratedCart,
        product_id: &ProductId,
    ) -> Result<u32, CheckoutError> {
        let quantity = hydrated.cart.increase_qty(product_id)?;
        self.sync_line(hydrated, product_id).await?;
        Ok(quantity)
    }

    /// Decreases a line's quantity by one, floored at 1.
    pub async fn decrease_qty(
        &self,
        hydrated: &mut HydratedCart,
        product_id: &ProductId,
    ) -> Result<u32, CheckoutError> {
        let quantity = hydrated.cart.decrease_qty(product_id)?;
        self.sync_line(hydrated, product_id).await?;
        Ok(quantity)
    }

    /// Empties the cart locally and in the store.
    #[tracing::instrument(skip(self, hydrated))]
    pub async fn clear(&self, hydrated: &mut HydratedCart) -> Result<(), CheckoutError> {
        hydrated.cart.clear();
        self.store.clear_cart(hydrated.cart_id).await?;
        Ok(())
    }

    async fn sync_line(
        &self,
        hydrated: &HydratedCart,
        product_id: &ProductId,
    ) -> Result<(), CheckoutError> {
        if let Some(quantity) = hydrated.cart.quantity(product_id) {
            self.store
                .upsert_cart_line(hydrated.cart_id, product_id, quantity)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, Product};
    use store::InMemoryStore;

    async fn setup() -> (CartService<InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::new();
        store
            .add_product(Product::new(
                "burger",
                "Classic Burger",
                Money::from_cents(12000),
                Some(10),
            ))
            .await;
        store
            .add_product(Product::new(
                "fries",
                "Large Fries",
                Money::from_cents(6000),
                Some(6),
            ))
            .await;
        (CartService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_load_for_user_creates_cart_once() {
        let (service, _) = setup().await;
        let user_id = UserId::new();

        let first = service.load_for_user(user_id).await.unwrap();
        let second = service.load_for_user(user_id).await.unwrap();
        assert_eq!(first.cart_id, second.cart_id);
        assert!(first.cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_item_persists_quantity() {
        let (service, store) = setup().await;
        let mut hydrated = service.load_for_user(UserId::new()).await.unwrap();
        let burger = ProductId::new("burger");

        service.add_item(&mut hydrated, &burger, 2).await.unwrap();
        service.add_item(&mut hydrated, &burger, 1).await.unwrap();

        assert_eq!(hydrated.cart.quantity(&burger), Some(3));
        assert_eq!(
            store.cart_line_quantity(hydrated.cart_id, &burger).await,
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_add_unknown_product_fails() {
        let (service, _) = setup().await;
        let mut hydrated = service.load_for_user(UserId::new()).await.unwrap();

        let result = service
            .add_item(&mut hydrated, &ProductId::new("ghost"), 1)
            .await;
        assert!(matches!(
            result,
            Err(CheckoutError::Store(StoreError::UnknownProduct(_)))
        ));
        assert!(hydrated.cart.is_empty());
    }

    #[tokio::test]
    async fn test_reload_reprices_from_catalog() {
        let (service, store) = setup().await;
        let user_id = UserId::new();
        let mut hydrated = service.load_for_user(user_id).await.unwrap();
        let burger = ProductId::new("burger");

        service.add_item(&mut hydrated, &burger, 2).await.unwrap();

        // Menu price changes while the cart sits persisted.
        store
            .add_product(Product::new(
                "burger",
                "Classic Burger",
                Money::from_cents(15000),
                Some(10),
            ))
            .await;

        let reloaded = service.load_for_user(user_id).await.unwrap();
        assert_eq!(reloaded.cart.total().cents(), 2 * 15000);
    }

    #[tokio::test]
    async fn test_remove_item_is_optimistic_on_store_failure() {
        let (service, store) = setup().await;
        let mut hydrated = service.load_for_user(UserId::new()).await.unwrap();
        let burger = ProductId::new("burger");
        service.add_item(&mut hydrated, &burger, 1).await.unwrap();

        store.set_fail_on_delete_line(true).await;
        let result = service.remove_item(&mut hydrated, &burger).await;

        // The error surfaces, but the local removal stands.
        assert!(matches!(
            result,
            Err(CheckoutError::Store(StoreError::Unavailable(_)))
        ));
        assert!(hydrated.cart.is_empty());
        assert_eq!(
            store.cart_line_quantity(hydrated.cart_id, &burger).await,
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_quantity_sync_on_increase_and_decrease() {
        let (service, store) = setup().await;
        let mut hydrated = service.load_for_user(UserId::new()).await.unwrap();
        let fries = ProductId::new("fries");
        service.add_item(&mut hydrated, &fries, 1).await.unwrap();

        assert_eq!(service.increase_qty(&mut hydrated, &fries).await.unwrap(), 2);
        assert_eq!(
            store.cart_line_quantity(hydrated.cart_id, &fries).await,
            Some(2)
        );

        assert_eq!(service.decrease_qty(&mut hydrated, &fries).await.unwrap(), 1);
        // Floored at one, locally and remotely.
        assert_eq!(service.decrease_qty(&mut hydrated, &fries).await.unwrap(), 1);
        assert_eq!(
            store.cart_line_quantity(hydrated.cart_id, &fries).await,
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_clear_empties_local_and_remote() {
        let (service, store) = setup().await;
        let mut hydrated = service.load_for_user(UserId::new()).await.unwrap();
        let burger = ProductId::new("burger");
        service.add_item(&mut hydrated, &burger, 2).await.unwrap();

        service.clear(&mut hydrated).await.unwrap();
        assert!(hydrated.cart.is_empty());
        assert_eq!(store.cart_line_quantity(hydrated.cart_id, &burger).await, None);
    }
}
