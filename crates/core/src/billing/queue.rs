//! Deferred operation queue
//!
//! Operations issued while the connection is not ready wait here as data,
//! each carrying its own continuations, and are replayed strictly in
//! enqueue order once the connection becomes ready.

use std::collections::VecDeque;
use std::fmt;

use storelink_domain::{
    BillingError, ProductDetails, ProductType, RawPurchase, RawPurchaseHistoryRecord, Result,
};

use super::launch::LaunchRequest;

pub type ProductDetailsHandler = Box<dyn FnOnce(Vec<ProductDetails>) + Send>;
pub type PurchasesHandler = Box<dyn FnOnce(Vec<RawPurchase>) + Send>;
pub type PurchaseHistoryHandler = Box<dyn FnOnce(Vec<RawPurchaseHistoryRecord>) + Send>;
pub type ErrorHandler = Box<dyn FnOnce(BillingError) + Send>;
/// Receives the purchase token on success
pub type CompletionHandler = Box<dyn FnOnce(Result<String>) + Send>;

/// A request waiting for (or being executed against) the billing client
pub enum QueuedOperation {
    QueryProductDetails {
        product_type: ProductType,
        product_ids: Vec<String>,
        on_receive: ProductDetailsHandler,
        on_error: ErrorHandler,
    },
    QueryPurchases {
        app_user_id: String,
        product_type: ProductType,
        on_success: PurchasesHandler,
        on_error: ErrorHandler,
    },
    QueryPurchaseHistory {
        product_type: ProductType,
        on_success: PurchaseHistoryHandler,
        on_error: ErrorHandler,
    },
    LaunchPurchaseFlow {
        request: LaunchRequest,
        on_error: ErrorHandler,
    },
    ConsumeOrAcknowledge {
        purchase_token: String,
        is_subscription: bool,
        on_complete: CompletionHandler,
    },
}

impl QueuedOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QueryProductDetails { .. } => "query_product_details",
            Self::QueryPurchases { .. } => "query_purchases",
            Self::QueryPurchaseHistory { .. } => "query_purchase_history",
            Self::LaunchPurchaseFlow { .. } => "launch_purchase_flow",
            Self::ConsumeOrAcknowledge { is_subscription: true, .. } => "acknowledge",
            Self::ConsumeOrAcknowledge { is_subscription: false, .. } => "consume",
        }
    }

    /// Invoke the operation's failure continuation
    pub fn fail(self, error: BillingError) {
        match self {
            Self::QueryProductDetails { on_error, .. }
            | Self::QueryPurchases { on_error, .. }
            | Self::QueryPurchaseHistory { on_error, .. }
            | Self::LaunchPurchaseFlow { on_error, .. } => on_error(error),
            Self::ConsumeOrAcknowledge { on_complete, .. } => on_complete(Err(error)),
        }
    }
}

impl fmt::Debug for QueuedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("QueuedOperation").field(&self.name()).finish()
    }
}

/// FIFO of operations awaiting a ready connection
///
/// Once closed the queue yields nothing and refuses new entries until
/// reopened.
#[derive(Debug, Default)]
pub struct DeferredOperationQueue {
    operations: VecDeque<QueuedOperation>,
    closed: bool,
}

impl DeferredOperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation; a closed queue hands it back
    pub fn enqueue(
        &mut self,
        operation: QueuedOperation,
    ) -> std::result::Result<(), QueuedOperation> {
        if self.closed {
            return Err(operation);
        }
        self.operations.push_back(operation);
        Ok(())
    }

    /// Put an operation back at the head so it runs before anything queued later
    pub fn push_front(
        &mut self,
        operation: QueuedOperation,
    ) -> std::result::Result<(), QueuedOperation> {
        if self.closed {
            return Err(operation);
        }
        self.operations.push_front(operation);
        Ok(())
    }

    pub fn pop_front(&mut self) -> Option<QueuedOperation> {
        if self.closed {
            return None;
        }
        self.operations.pop_front()
    }

    /// Remove every operation, oldest first
    pub fn drain_in_order(&mut self) -> Vec<QueuedOperation> {
        if self.closed {
            return Vec::new();
        }
        self.operations.drain(..).collect()
    }

    /// Close the queue and hand back whatever was pending, oldest first
    ///
    /// The caller is expected to fail each returned operation.
    pub fn close(&mut self) -> Vec<QueuedOperation> {
        self.closed = true;
        self.operations.drain(..).collect()
    }

    pub fn reopen(&mut self) {
        self.closed = false;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Fail every operation with a clone of `error`, oldest first
pub fn fail_all(operations: Vec<QueuedOperation>, error: &BillingError) {
    for operation in operations {
        operation.fail(error.clone());
    }
}
