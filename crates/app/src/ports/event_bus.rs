//! Event bus port — publish activity for interested subscribers.

use std::future::Future;

use climatehub_domain::event::Event;

/// Publishes domain events to interested subscribers.
///
/// Publishing is best-effort: having no subscriber is not a failure.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = ()> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = ()> + Send {
        (**self).publish(event)
    }
}
