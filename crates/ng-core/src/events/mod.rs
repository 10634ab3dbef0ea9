use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

/// Notification bus the UI shell subscribes to.
///
/// Unlike the command bus this carries facts ("a batch was committed"),
/// keyed by event type. Handlers must not publish from inside a handler.
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all notifications implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Handler trait for notification handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Notifications raised by the synchronization engine
pub mod events {
    use super::Event;
    use crate::commands::{NoParamCommand, VisualAttribute};

    /// A visual attribute was written to the selected rows of a table
    #[derive(Debug, Clone)]
    pub struct VisualAttributeSetInWorkbook {
        pub attribute: VisualAttribute,
        pub table: String,
    }

    /// A synchronization batch was written to a table
    #[derive(Debug, Clone)]
    pub struct BatchCommitted {
        pub table: String,
        pub rows_written: usize,
        pub columns_committed: usize,
    }

    /// A synchronization attempt was abandoned before it started
    #[derive(Debug, Clone)]
    pub struct SyncAborted {
        pub operation: String,
        pub reason: String,
    }

    /// A handler failed while processing a graph event
    #[derive(Debug, Clone)]
    pub struct HandlerFailed {
        pub event: String,
        pub error: String,
    }

    /// A no-parameter command the shell is expected to carry out
    #[derive(Debug, Clone)]
    pub struct CommandRequested {
        pub command: NoParamCommand,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        VisualAttributeSetInWorkbook,
        BatchCommitted,
        SyncAborted,
        HandlerFailed,
        CommandRequested
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_default().push(handler);
    }

    /// Subscribe a closure that receives the concrete event type
    pub fn subscribe_fn<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event: &dyn Event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
