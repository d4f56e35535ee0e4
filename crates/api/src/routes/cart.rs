//! Cart load and sync endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use checkout::HydratedCart;
use common::UserId;
use domain::ProductId;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::ApiError;
use crate::routes::orders::{AppState, UserQuery};

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub user_id: uuid::Uuid,
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub cart_id: String,
    pub lines: Vec<CartLineResponse>,
    pub total_cents: i64,
    pub total_quantity: u32,
}

impl CartResponse {
    fn from_hydrated(hydrated: &HydratedCart) -> Self {
        let mut lines: Vec<CartLineResponse> = hydrated
            .cart
            .lines()
            .map(|line| CartLineResponse {
                product_id: line.product_id.to_string(),
                name: line.name.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
            })
            .collect();
        lines.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        Self {
            cart_id: hydrated.cart_id.to_string(),
            lines,
            total_cents: hydrated.cart.total().cents(),
            total_quantity: hydrated.cart.total_quantity(),
        }
    }
}

/// GET /cart — hydrate the user's persisted cart.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let hydrated = state
        .carts
        .load_for_user(UserId::from_uuid(query.user_id))
        .await?;
    Ok(Json(CartResponse::from_hydrated(&hydrated)))
}

/// POST /cart/items — add a product to the user's cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = UserId::from_uuid(req.user_id);
    let product_id = ProductId::new(req.product_id);

    let mut hydrated = state.carts.load_for_user(user_id).await?;
    state
        .carts
        .add_item(&mut hydrated, &product_id, req.quantity)
        .await?;

    Ok(Json(CartResponse::from_hydrated(&hydrated)))
}

/// DELETE /cart/items/{product_id} — remove a product from the cart.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = UserId::from_uuid(query.user_id);
    let product_id = ProductId::new(product_id);

    let mut hydrated = state.carts.load_for_user(user_id).await?;
    state.carts.remove_item(&mut hydrated, &product_id).await?;

    Ok(Json(CartResponse::from_hydrated(&hydrated)))
}
