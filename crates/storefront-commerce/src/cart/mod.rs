//! Shopping cart module.
//!
//! The cart here is a read-only snapshot of what the commerce backend last
//! confirmed. Every derived value (counts, readiness) is computed from the
//! snapshot on demand.

mod cart;
mod discount;
mod pricing;

pub use cart::{Cart, CartRegion, LineItem, MAX_QUANTITY_PER_ITEM};
pub use discount::{AppliedDiscount, AppliedGiftCard, DiscountKind};
pub use pricing::{CartSummary, CartTotals};
