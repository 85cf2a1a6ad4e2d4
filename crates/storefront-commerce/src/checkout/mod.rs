//! Checkout module.
//!
//! Contains addresses, shipping options and methods, payment sessions,
//! orders, and the derived checkout stage.

mod address;
mod flow;
mod order;
mod payment;
mod shipping;

pub use address::Address;
pub use flow::{CheckoutRequirement, CheckoutStage};
pub use order::{FulfillmentStatus, Order, OrderLineItem, OrderStatus, PaymentStatus};
pub use payment::{PaymentSession, PaymentSessionStatus};
pub use shipping::{PriceType, ShippingMethod, ShippingOption};
