//! Domain model: orders, payment intents, the gateway schema and the ports
//! the application layer talks through.

pub mod gateway;
pub mod money;
pub mod order;
pub mod payment;
pub mod payment_method;
pub mod ports;
pub mod user;
