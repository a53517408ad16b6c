//! Order entity, status machines and value objects.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{CartItem, Money, OrderItem, ProductId, UserId};
