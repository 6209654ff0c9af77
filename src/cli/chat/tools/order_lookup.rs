use std::collections::HashMap;
use std::fmt;

/// Tool name advertised to the model.
pub const ORDER_LOOKUP_TOOL: &str = "get_order_status";

const NOT_ENABLED_MESSAGE: &str = "⚠️ Order status lookup is not enabled for this query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Shipped,
    Processing,
    Delivered,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Processing => "Processing",
            OrderStatus::Delivered => "Delivered",
        };
        write!(f, "{label}")
    }
}

type EnabledWhen = Box<dyn Fn(&str) -> bool + Send + Sync>;
type OnMiss = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Simulated order lookup against a fixed in-memory table.
///
/// The enablement gate and the miss message are configuration on the tool
/// itself: `enabled_when` decides from the user's query whether the tool may
/// run at all, and `on_miss` formats the reply for an unknown order id.
pub struct OrderLookup {
    orders: HashMap<String, OrderStatus>,
    enabled_when: EnabledWhen,
    on_miss: OnMiss,
}

impl OrderLookup {
    /// The support-desk configuration: a three-order table, gated on the
    /// query mentioning "order".
    pub fn support_desk() -> Self {
        let orders = HashMap::from([
            ("123".to_string(), OrderStatus::Shipped),
            ("456".to_string(), OrderStatus::Processing),
            ("789".to_string(), OrderStatus::Delivered),
        ]);

        Self::new(orders)
            .enabled_when(|query| query.to_lowercase().contains("order"))
            .on_miss(|order_id| {
                format!("❌ Sorry, no order found with ID {order_id}. Please double-check!")
            })
    }

    pub fn new(orders: HashMap<String, OrderStatus>) -> Self {
        Self {
            orders,
            enabled_when: Box::new(|_| true),
            on_miss: Box::new(|order_id| format!("No order found with ID {order_id}.")),
        }
    }

    pub fn enabled_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.enabled_when = Box::new(predicate);
        self
    }

    pub fn on_miss<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.on_miss = Box::new(handler);
        self
    }

    /// Looks up an order. Always returns a string: a gate notice, a miss
    /// message, or the formatted status line.
    pub fn lookup(&self, order_id: &str, query: &str) -> String {
        if !(self.enabled_when)(query) {
            return NOT_ENABLED_MESSAGE.to_string();
        }

        match self.orders.get(order_id) {
            Some(status) => format!("✅ Order {order_id} is currently {status}."),
            None => (self.on_miss)(order_id),
        }
    }
}
