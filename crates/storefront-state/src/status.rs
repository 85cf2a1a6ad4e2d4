//! Loading/error flags per logical operation group.
//!
//! Each operation marks its group as loading for as long as it is queued or
//! in flight. The flag is released by a guard on every exit path, so a
//! failing or cancelled call can never leave a group stuck in loading.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

/// Logical group an operation reports its status under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationGroup {
    Cart,
    Items,
    Promotions,
    Shipping,
    Payment,
    Checkout,
    Customer,
    Orders,
}

impl OperationGroup {
    pub const ALL: [OperationGroup; 8] = [
        OperationGroup::Cart,
        OperationGroup::Items,
        OperationGroup::Promotions,
        OperationGroup::Shipping,
        OperationGroup::Payment,
        OperationGroup::Checkout,
        OperationGroup::Customer,
        OperationGroup::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Items => "items",
            Self::Promotions => "promotions",
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Checkout => "checkout",
            Self::Customer => "customer",
            Self::Orders => "orders",
        }
    }
}

impl fmt::Display for OperationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user-facing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitializeCart,
    CreateCart,
    RetrieveCart,
    UpdateCart,
    ClearCart,
    AddItem,
    UpdateItem,
    RemoveItem,
    AddDiscount,
    RemoveDiscount,
    AddGiftCard,
    RemoveGiftCard,
    ListShippingOptions,
    AddShippingMethod,
    InitiatePaymentSession,
    UpdatePaymentSession,
    SelectPaymentSession,
    RefreshPaymentSession,
    CompleteCart,
    RetrieveCustomer,
    UpdateCustomer,
    SaveAddress,
    DeleteAddress,
    ListOrders,
    RetrieveOrder,
}

impl Operation {
    pub fn group(&self) -> OperationGroup {
        use Operation::*;
        match self {
            InitializeCart | CreateCart | RetrieveCart | UpdateCart | ClearCart => {
                OperationGroup::Cart
            }
            AddItem | UpdateItem | RemoveItem => OperationGroup::Items,
            AddDiscount | RemoveDiscount | AddGiftCard | RemoveGiftCard => {
                OperationGroup::Promotions
            }
            ListShippingOptions | AddShippingMethod => OperationGroup::Shipping,
            InitiatePaymentSession
            | UpdatePaymentSession
            | SelectPaymentSession
            | RefreshPaymentSession => OperationGroup::Payment,
            CompleteCart => OperationGroup::Checkout,
            RetrieveCustomer | UpdateCustomer | SaveAddress | DeleteAddress => {
                OperationGroup::Customer
            }
            ListOrders | RetrieveOrder => OperationGroup::Orders,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Operation::*;
        match self {
            InitializeCart => "initialize_cart",
            CreateCart => "create_cart",
            RetrieveCart => "retrieve_cart",
            UpdateCart => "update_cart",
            ClearCart => "clear_cart",
            AddItem => "add_item",
            UpdateItem => "update_item",
            RemoveItem => "remove_item",
            AddDiscount => "add_discount",
            RemoveDiscount => "remove_discount",
            AddGiftCard => "add_gift_card",
            RemoveGiftCard => "remove_gift_card",
            ListShippingOptions => "list_shipping_options",
            AddShippingMethod => "add_shipping_method",
            InitiatePaymentSession => "initiate_payment_session",
            UpdatePaymentSession => "update_payment_session",
            SelectPaymentSession => "select_payment_session",
            RefreshPaymentSession => "refresh_payment_session",
            CompleteCart => "complete_cart",
            RetrieveCustomer => "retrieve_customer",
            UpdateCustomer => "update_customer",
            SaveAddress => "save_address",
            DeleteAddress => "delete_address",
            ListOrders => "list_orders",
            RetrieveOrder => "retrieve_order",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loading/error pair for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationStatus {
    /// Operations queued or in flight.
    pub pending: u32,
    /// Localized message from the most recent failure.
    pub error: Option<String>,
}

impl OperationStatus {
    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }
}

/// Status of every group at one point in time.
pub type StatusSnapshot = BTreeMap<OperationGroup, OperationStatus>;

/// Shared status board, observable through a watch channel.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<StatusSnapshot>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let initial = OperationGroup::ALL
            .iter()
            .map(|g| (*g, OperationStatus::default()))
            .collect();
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn get(&self, group: OperationGroup) -> OperationStatus {
        self.tx.borrow().get(&group).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    /// Any group currently loading.
    pub fn any_loading(&self) -> bool {
        self.tx.borrow().values().any(OperationStatus::is_loading)
    }

    pub fn clear_error(&self, group: OperationGroup) {
        self.tx.send_modify(|s| {
            s.entry(group).or_default().error = None;
        });
    }

    /// Mark an operation as started: clears the group's error and holds it
    /// loading until the returned guard drops.
    pub fn begin(&self, operation: Operation) -> InFlight<'_> {
        let group = operation.group();
        self.tx.send_modify(|s| {
            let status = s.entry(group).or_default();
            status.pending += 1;
            status.error = None;
        });
        InFlight {
            board: self,
            operation,
        }
    }
}

/// Guard returned by [`StatusBoard::begin`].
#[derive(Debug)]
pub struct InFlight<'a> {
    board: &'a StatusBoard,
    operation: Operation,
}

impl InFlight<'_> {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Record a failure message for the group. Loading is still released
    /// when the guard drops.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.board.tx.send_modify(|s| {
            s.entry(self.operation.group()).or_default().error = Some(message);
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let group = self.operation.group();
        self.board.tx.send_modify(|s| {
            let status = s.entry(group).or_default();
            status.pending = status.pending.saturating_sub(1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_loading_on_drop() {
        let board = StatusBoard::new();
        {
            let _flight = board.begin(Operation::AddItem);
            assert!(board.get(OperationGroup::Items).is_loading());
            assert!(!board.get(OperationGroup::Cart).is_loading());
        }
        assert!(!board.get(OperationGroup::Items).is_loading());
        assert!(!board.any_loading());
    }

    #[test]
    fn test_failure_survives_guard_drop() {
        let board = StatusBoard::new();
        {
            let flight = board.begin(Operation::AddDiscount);
            flight.fail("Nieprawidłowy kod");
        }
        let status = board.get(OperationGroup::Promotions);
        assert!(!status.is_loading());
        assert_eq!(status.error.as_deref(), Some("Nieprawidłowy kod"));

        // A new attempt clears the previous error.
        let _again = board.begin(Operation::RemoveDiscount);
        assert_eq!(board.get(OperationGroup::Promotions).error, None);
    }

    #[test]
    fn test_overlapping_operations_keep_group_loading() {
        let board = StatusBoard::new();
        let first = board.begin(Operation::AddItem);
        let second = board.begin(Operation::RemoveItem);
        drop(first);
        assert!(board.get(OperationGroup::Items).is_loading());
        drop(second);
        assert!(!board.get(OperationGroup::Items).is_loading());
    }

    #[test]
    fn test_subscribers_see_changes() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        rx.borrow_and_update();
        let flight = board.begin(Operation::CompleteCart);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update()[&OperationGroup::Checkout].is_loading());
        drop(flight);
    }

    #[test]
    fn test_every_operation_has_a_group() {
        assert_eq!(Operation::SelectPaymentSession.group(), OperationGroup::Payment);
        assert_eq!(Operation::ListShippingOptions.group(), OperationGroup::Shipping);
        assert_eq!(Operation::CompleteCart.group(), OperationGroup::Checkout);
        assert_eq!(Operation::ClearCart.group(), OperationGroup::Cart);
    }
}
