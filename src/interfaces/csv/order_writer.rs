use crate::domain::order::{Order, OrderId, OrderState, PaymentState};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OrderRecord<'a> {
    order: OrderId,
    number: &'a str,
    state: OrderState,
    payment_total: String,
    pending_payment_total: String,
    payment_state: PaymentState,
}

impl<'a> From<&'a Order> for OrderRecord<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            order: order.id,
            number: &order.number,
            state: order.state,
            payment_total: order.payment_total.to_string(),
            pending_payment_total: order.pending_payment_total.to_string(),
            payment_state: order.payment_state(),
        }
    }
}

/// Writes the final state of orders as CSV.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: impl IntoIterator<Item = Order>) -> Result<()> {
        let mut written = false;
        for order in orders {
            self.writer.serialize(OrderRecord::from(&order))?;
            written = true;
        }
        if !written {
            self.writer.write_record([
                "order",
                "number",
                "state",
                "payment_total",
                "pending_payment_total",
                "payment_state",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
