pub mod order_lookup;

pub use order_lookup::{OrderLookup, ORDER_LOOKUP_TOOL};
