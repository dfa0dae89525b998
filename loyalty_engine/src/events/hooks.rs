use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderAccruedEvent,
    OrderInvalidatedEvent,
    WithdrawalProcessedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_accrued_producer: Vec<EventProducer<OrderAccruedEvent>>,
    pub order_invalidated_producer: Vec<EventProducer<OrderInvalidatedEvent>>,
    pub withdrawal_processed_producer: Vec<EventProducer<WithdrawalProcessedEvent>>,
}

pub struct EventHandlers {
    pub on_order_accrued: Option<EventHandler<OrderAccruedEvent>>,
    pub on_order_invalidated: Option<EventHandler<OrderInvalidatedEvent>>,
    pub on_withdrawal_processed: Option<EventHandler<WithdrawalProcessedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_accrued = hooks.on_order_accrued.map(|f| EventHandler::new(buffer_size, f));
        let on_order_invalidated = hooks.on_order_invalidated.map(|f| EventHandler::new(buffer_size, f));
        let on_withdrawal_processed = hooks.on_withdrawal_processed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_accrued, on_order_invalidated, on_withdrawal_processed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_accrued {
            result.order_accrued_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_invalidated {
            result.order_invalidated_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_withdrawal_processed {
            result.withdrawal_processed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every installed handler. Each task ends once all of its producers have been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_accrued {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_invalidated {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_withdrawal_processed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_accrued: Option<Handler<OrderAccruedEvent>>,
    pub on_order_invalidated: Option<Handler<OrderInvalidatedEvent>>,
    pub on_withdrawal_processed: Option<Handler<WithdrawalProcessedEvent>>,
}

impl EventHooks {
    pub fn on_order_accrued<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAccruedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_accrued = Some(Arc::new(f));
        self
    }

    pub fn on_order_invalidated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderInvalidatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_invalidated = Some(Arc::new(f));
        self
    }

    pub fn on_withdrawal_processed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WithdrawalProcessedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_withdrawal_processed = Some(Arc::new(f));
        self
    }
}
