//! Order-lifecycle and payment-confirmation workflow.
//!
//! This crate drives a cart through checkout:
//! 1. The active-order guard rejects a new order while one is in flight.
//! 2. The creation service inserts order, payment, and line rows in a
//!    fixed sequence and clears the cart only when all three succeed.
//! 3. Payment dispatch branches on method: cash confirms on the spot,
//!    gateway methods hand off to a hosted checkout page.
//! 4. The session poller watches the payment session until it resolves,
//!    with a strict no-tick-after-cancel contract.
//! 5. The countdown tracker estimates when the order is ready.

pub mod cart_service;
pub mod confirm;
pub mod creation;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod http_gateway;
pub mod identity;
pub mod polling;
pub mod tracking;

pub use cart_service::{CartService, HydratedCart};
pub use confirm::PaymentConfirmer;
pub use creation::{CreatedOrder, OrderCreationService};
pub use dispatch::{DispatchOutcome, PaymentDispatcher};
pub use error::{CheckoutError, CreateStage};
pub use gateway::{
    GatewayError, GatewayRequest, GatewayResponse, InMemoryGateway, PaymentGateway,
};
pub use guard::ActiveOrderGuard;
pub use http_gateway::HttpGateway;
pub use identity::Identity;
pub use polling::{
    NoopObserver, PollError, PollObserver, PollOutcome, PollSnapshot, PollState, PollingConfig,
    SessionPoller,
};
pub use tracking::{CountdownHandle, CountdownTick, display_status, spawn_countdown};
