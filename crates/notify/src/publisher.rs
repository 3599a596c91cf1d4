//! Fans produced responses out to subscribers registered by response type.
//!
//! Every subscriber registered for a response's type sees that response;
//! subscribers don't compete for it. Individual handler failures don't block
//! other subscribers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use dds_core::{DdsError, Response};
use rayon::prelude::*;

use crate::traits::{Delivery, DeliveryResult, Notifiable};

fn same_subscriber(a: &Arc<dyn Notifiable>, b: &Arc<dyn Notifiable>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Response type → subscribers, in registration order.
#[derive(Default)]
pub struct Publisher {
    subscribers: RwLock<HashMap<String, Vec<Arc<dyn Notifiable>>>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for `response_type`.
    ///
    /// Registering the same subscriber twice for one type is a no-op;
    /// returns whether it was newly added.
    pub fn add_subscriber(
        &self,
        response_type: impl Into<String>,
        subscriber: Arc<dyn Notifiable>,
    ) -> bool {
        let mut map = self.subscribers.write().expect("publisher lock poisoned");
        let list = map.entry(response_type.into()).or_default();
        if list.iter().any(|s| same_subscriber(s, &subscriber)) {
            return false;
        }
        list.push(subscriber);
        true
    }

    /// Unregister `subscriber` from `response_type`; returns whether it was present.
    pub fn remove_subscriber(&self, response_type: &str, subscriber: &Arc<dyn Notifiable>) -> bool {
        let mut map = self.subscribers.write().expect("publisher lock poisoned");
        let Some(list) = map.get_mut(response_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| !same_subscriber(s, subscriber));
        let removed = list.len() != before;
        if list.is_empty() {
            map.remove(response_type);
        }
        removed
    }

    pub fn subscriber_count(&self, response_type: &str) -> usize {
        self.subscribers
            .read()
            .expect("publisher lock poisoned")
            .get(response_type)
            .map_or(0, Vec::len)
    }

    pub fn has_subscribers(&self, response_type: &str) -> bool {
        self.subscriber_count(response_type) > 0
    }

    /// Fail with [`DdsError::UnconfiguredSink`] if any response has no subscriber.
    pub fn ensure_routable(&self, responses: &[Response]) -> Result<(), DdsError> {
        let map = self.subscribers.read().expect("publisher lock poisoned");
        for response in responses {
            let routed = map
                .get(&response.response_type)
                .is_some_and(|list| !list.is_empty());
            if !routed {
                return Err(DdsError::UnconfiguredSink(response.response_type.clone()));
            }
        }
        Ok(())
    }

    /// Deliver each response to every subscriber registered for its type.
    ///
    /// The subscriber lists are snapshotted up front, so handlers may
    /// register or unregister subscribers without deadlocking. Returns one
    /// result per handler invocation.
    pub fn publish(&self, delivery: &Delivery<'_>, responses: &[Response]) -> Vec<DeliveryResult> {
        let jobs: Vec<(&Response, Arc<dyn Notifiable>)> = {
            let map = self.subscribers.read().expect("publisher lock poisoned");
            responses
                .iter()
                .flat_map(|response| {
                    map.get(&response.response_type)
                        .into_iter()
                        .flatten()
                        .map(move |s| (response, Arc::clone(s)))
                })
                .collect()
        };

        if jobs.is_empty() {
            tracing::debug!(
                event = delivery.event,
                rule_id = %delivery.rule_id,
                "No subscribers for produced responses"
            );
            return Vec::new();
        }

        jobs.into_par_iter()
            .map(|(response, subscriber)| {
                let start = Instant::now();
                let result = subscriber.handle_response(delivery, response);
                let duration_ms = start.elapsed().as_millis() as u64;

                let (success, error) = match result {
                    Ok(()) => {
                        tracing::info!(
                            event = delivery.event,
                            user_id = delivery.user_id,
                            subscriber = subscriber.name(),
                            response_type = %response.response_type,
                            duration_ms,
                            "Response delivered"
                        );
                        (true, None)
                    }
                    Err(e) => {
                        tracing::warn!(
                            event = delivery.event,
                            user_id = delivery.user_id,
                            subscriber = subscriber.name(),
                            response_type = %response.response_type,
                            error = %e,
                            duration_ms,
                            "Response delivery failed"
                        );
                        (false, Some(e.to_string()))
                    }
                };

                DeliveryResult {
                    subscriber: subscriber.name().to_string(),
                    response_type: response.response_type.clone(),
                    success,
                    error,
                    duration_ms,
                }
            })
            .collect()
    }
}
