use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CardBoundEvent, EventHandler, EventProducer, Handler, InfoRetrievedEvent, OrderCommittedEvent};

/// The producer side handed to the gateway. Cloneable; publishing to an empty vector is a no-op,
/// so a gateway without registered hooks costs nothing.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_committed: Vec<EventProducer<OrderCommittedEvent>>,
    pub info_retrieved: Vec<EventProducer<InfoRetrievedEvent>>,
    pub card_bound: Vec<EventProducer<CardBoundEvent>>,
}

pub struct EventHandlers {
    pub on_order_committed: Option<EventHandler<OrderCommittedEvent>>,
    pub on_info_retrieved: Option<EventHandler<InfoRetrievedEvent>>,
    pub on_card_bound: Option<EventHandler<CardBoundEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_committed: hooks.on_order_committed.map(|f| EventHandler::new(buffer_size, f)),
            on_info_retrieved: hooks.on_info_retrieved.map(|f| EventHandler::new(buffer_size, f)),
            on_card_bound: hooks.on_card_bound.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_committed {
            result.order_committed.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_info_retrieved {
            result.info_retrieved.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_card_bound {
            result.card_bound.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_committed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_info_retrieved {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_card_bound {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

/// Caller-supplied callbacks, registered explicitly at construction.
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_committed: Option<Handler<OrderCommittedEvent>>,
    pub on_info_retrieved: Option<Handler<InfoRetrievedEvent>>,
    pub on_card_bound: Option<Handler<CardBoundEvent>>,
}

impl EventHooks {
    pub fn on_order_committed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCommittedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_committed = Some(Arc::new(f));
        self
    }

    pub fn on_info_retrieved<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(InfoRetrievedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_info_retrieved = Some(Arc::new(f));
        self
    }

    pub fn on_card_bound<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CardBoundEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_card_bound = Some(Arc::new(f));
        self
    }
}
