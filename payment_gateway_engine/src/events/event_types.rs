use crate::{bind_request::BindRequest, order::Order};

/// Emitted when a settlement callback commits an order.
#[derive(Debug, Clone)]
pub struct OrderCommittedEvent {
    pub order: Order,
}

impl OrderCommittedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted the first time a two-phase channel delivers its payment details.
#[derive(Debug, Clone)]
pub struct InfoRetrievedEvent {
    pub order: Order,
}

impl InfoRetrievedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when a card-binding callback succeeds.
#[derive(Debug, Clone)]
pub struct CardBoundEvent {
    pub bind_request: BindRequest,
}

impl CardBoundEvent {
    pub fn new(bind_request: BindRequest) -> Self {
        Self { bind_request }
    }
}
