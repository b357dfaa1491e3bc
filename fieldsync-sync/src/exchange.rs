//! The data exchange boundary.
//!
//! Each side (the internal system and every integration) implements
//! [`DataExchange`] once. It is the only place where I/O happens; everything
//! behind it in this crate is pure computation.

use crate::error::ExchangeError;
use crate::{ChangeReport, RequestDao, SyncOrder};
use async_trait::async_trait;
use fieldsync_types::Side;

/// One side's capability to report changes and apply orders.
#[async_trait]
pub trait DataExchange: Send + Sync {
    /// Which side this exchange speaks for.
    fn side(&self) -> Side;

    /// Name used in logs.
    fn name(&self) -> &str {
        self.side().as_str()
    }

    /// Returns every object changed since `request.from_timestamp()`,
    /// restricted to the requested objects and fields, with values already
    /// normalized into this side's declared kinds.
    async fn get_sync_report(&self, request: &RequestDao) -> Result<ChangeReport, ExchangeError>;

    /// Applies an order to this side.
    ///
    /// Must be an idempotent upsert: the core may deliver the same order
    /// again after a failure.
    async fn execute_sync_order(&self, order: &SyncOrder) -> Result<(), ExchangeError>;
}

/// An in-memory exchange for testing.
pub mod mock {
    use super::*;
    use crate::ObjectChange;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves a canned set of changed objects and records what it is asked
    /// and what it receives.
    #[derive(Debug)]
    pub struct MemoryExchange {
        side: Side,
        integration: String,
        objects: Vec<ObjectChange>,
        fetch_failure: Option<String>,
        delivery_failure: Option<String>,
        fetch_delay: Option<Duration>,
        requests: Mutex<Vec<RequestDao>>,
        delivered: Mutex<Vec<SyncOrder>>,
    }

    impl MemoryExchange {
        /// Creates an exchange with no changes.
        pub fn new(side: Side) -> Self {
            Self {
                side,
                integration: "memory".to_string(),
                objects: Vec::new(),
                fetch_failure: None,
                delivery_failure: None,
                fetch_delay: None,
                requests: Mutex::new(Vec::new()),
                delivered: Mutex::new(Vec::new()),
            }
        }

        /// Adds a changed object to every report.
        #[must_use]
        pub fn with_object(mut self, object: ObjectChange) -> Self {
            self.objects.push(object);
            self
        }

        #[must_use]
        pub fn with_integration(mut self, integration: impl Into<String>) -> Self {
            self.integration = integration.into();
            self
        }

        /// Makes every fetch fail with a network error.
        #[must_use]
        pub fn failing_fetch(mut self, message: impl Into<String>) -> Self {
            self.fetch_failure = Some(message.into());
            self
        }

        /// Makes every delivery fail with a rejection.
        #[must_use]
        pub fn failing_delivery(mut self, message: impl Into<String>) -> Self {
            self.delivery_failure = Some(message.into());
            self
        }

        /// Delays every fetch.
        #[must_use]
        pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
            self.fetch_delay = Some(delay);
            self
        }

        /// Requests received so far.
        pub fn requests(&self) -> Vec<RequestDao> {
            self.requests.lock().unwrap().clone()
        }

        /// Orders delivered so far, oldest first.
        pub fn delivered(&self) -> Vec<SyncOrder> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DataExchange for MemoryExchange {
        fn side(&self) -> Side {
            self.side
        }

        async fn get_sync_report(
            &self,
            request: &RequestDao,
        ) -> Result<ChangeReport, ExchangeError> {
            self.requests.lock().unwrap().push(request.clone());

            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(message) = &self.fetch_failure {
                return Err(ExchangeError::Network(message.clone()));
            }

            let mut report =
                ChangeReport::new(self.side, &self.integration, request.from_timestamp());
            for object in &self.objects {
                let requested = request.object(&object.entity).is_some();
                let in_window = object
                    .changed_at
                    .is_none_or(|ts| ts >= request.from_timestamp());
                if requested && in_window {
                    report.add_object(object.clone());
                }
            }
            Ok(report)
        }

        async fn execute_sync_order(&self, order: &SyncOrder) -> Result<(), ExchangeError> {
            if let Some(message) = &self.delivery_failure {
                return Err(ExchangeError::Rejected(message.clone()));
            }
            self.delivered.lock().unwrap().push(order.clone());
            Ok(())
        }
    }
}
