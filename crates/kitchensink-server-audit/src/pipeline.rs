// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditEntry;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;
use kitchensink_server_config::QueueOverflowPolicy;

/// Queues audit entries and fans them out to sinks on a background task.
///
/// Appending is fire-and-forget: sink failures are logged and never reach the
/// operation that produced the entry.
pub struct AuditService {
	tx: mpsc::Sender<AuditEntry>,
	overflow_policy: QueueOverflowPolicy,
	sinks: Vec<Arc<dyn AuditSink>>,
	worker: JoinHandle<()>,
}

impl AuditService {
	/// Must be called from within a tokio runtime.
	pub fn new(
		global_filter: AuditFilterConfig,
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));

		let worker = tokio::spawn(Self::background_task(rx, global_filter, sinks.clone()));

		Self {
			tx,
			overflow_policy,
			sinks,
			worker,
		}
	}

	async fn background_task(
		mut rx: mpsc::Receiver<AuditEntry>,
		global_filter: AuditFilterConfig,
		sinks: Vec<Arc<dyn AuditSink>>,
	) {
		let mut in_flight = JoinSet::new();

		while let Some(entry) = rx.recv().await {
			while in_flight.try_join_next().is_some() {}

			if !global_filter.allows(&entry) {
				continue;
			}

			let entry = Arc::new(entry);

			for sink in &sinks {
				if !sink.filter().allows(&entry) {
					continue;
				}

				let sink = Arc::clone(sink);
				let entry = Arc::clone(&entry);

				in_flight.spawn(async move {
					if let Err(e) = sink.publish(Arc::clone(&entry)).await {
						warn!(
							sink = sink.name(),
							entity_type = %entry.entity_type,
							entity_id = %entry.entity_id,
							action = %entry.action,
							error = %e,
							"audit sink publish failed"
						);
					}
				});
			}
		}

		while in_flight.join_next().await.is_some() {}
	}

	/// Close the queue and wait until every queued entry has reached its sinks.
	///
	/// Entries still waiting under the `Block` policy are delivered before the
	/// worker exits.
	pub async fn shutdown(self) {
		let Self { tx, worker, .. } = self;
		drop(tx);
		if let Err(e) = worker.await {
			warn!(error = %e, "audit worker ended abnormally");
		}
	}

	/// Queue an entry for processing.
	///
	/// Returns `true` if the entry was queued, `false` if dropped.
	///
	/// - `Block`: spawns a task that waits for queue space, so the caller never waits
	/// - `DropNewest`: drops the new entry when the queue is full
	/// - `DropOldest`: currently behaves like `DropNewest`; the channel cannot evict
	///   entries from the sending side
	#[instrument(skip(self, entry), fields(action = %entry.action, entity_type = %entry.entity_type))]
	pub fn log(&self, entry: AuditEntry) -> bool {
		match self.overflow_policy {
			QueueOverflowPolicy::Block => {
				let tx = self.tx.clone();
				tokio::spawn(async move {
					if tx.send(entry).await.is_err() {
						warn!("audit queue closed, entry lost");
					}
				});
				true
			}
			QueueOverflowPolicy::DropNewest | QueueOverflowPolicy::DropOldest => {
				self.try_log(entry).is_ok()
			}
		}
	}

	/// Queue an entry without waiting, reporting why it was not queued.
	pub fn try_log(&self, entry: AuditEntry) -> AuditResult<()> {
		self.tx.try_send(entry).map_err(|e| match e {
			TrySendError::Full(_) => AuditError::QueueFull,
			TrySendError::Closed(_) => AuditError::Shutdown,
		})
	}

	/// Queue an entry, waiting for space if the queue is full.
	pub async fn log_blocking(&self, entry: AuditEntry) -> AuditResult<()> {
		self.tx.send(entry).await.map_err(|_| AuditError::Shutdown)
	}

	/// Run every sink's health check and collect the failures.
	pub async fn health_check(&self) -> Vec<AuditError> {
		let mut failures = Vec::new();
		for sink in &self.sinks {
			if let Err(source) = sink.health_check().await {
				failures.push(AuditError::SinkError {
					sink: sink.name().to_string(),
					source,
				});
			}
		}
		failures
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AuditSinkError;
	use crate::event::AuditAction;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::time::{sleep, Duration};

	struct TestSink {
		name: String,
		filter: AuditFilterConfig,
		publish_count: Arc<AtomicUsize>,
	}

	impl TestSink {
		fn new(name: &str) -> Self {
			Self {
				name: name.to_string(),
				filter: AuditFilterConfig::default(),
				publish_count: Arc::new(AtomicUsize::new(0)),
			}
		}

		fn count(&self) -> usize {
			self.publish_count.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl AuditSink for TestSink {
		fn name(&self) -> &str {
			&self.name
		}

		fn filter(&self) -> &AuditFilterConfig {
			&self.filter
		}

		async fn publish(&self, _entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
			self.publish_count.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	struct FailingSink {
		filter: AuditFilterConfig,
	}

	#[async_trait]
	impl AuditSink for FailingSink {
		fn name(&self) -> &str {
			"failing"
		}

		fn filter(&self) -> &AuditFilterConfig {
			&self.filter
		}

		async fn publish(&self, _entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
			Err(AuditSinkError::Transient("test error".to_string()))
		}

		async fn health_check(&self) -> Result<(), AuditSinkError> {
			Err(AuditSinkError::Permanent("unreachable".to_string()))
		}
	}

	fn entry(action: AuditAction) -> AuditEntry {
		AuditEntry::builder(action, "member", "1").build()
	}

	fn service(sinks: Vec<Arc<dyn AuditSink>>) -> AuditService {
		AuditService::new(
			AuditFilterConfig::default(),
			10000,
			QueueOverflowPolicy::DropNewest,
			sinks,
		)
	}

	#[tokio::test]
	async fn test_log_sends_to_sink() {
		let sink = Arc::new(TestSink::new("test"));
		let service = service(vec![sink.clone()]);

		assert!(service.log(entry(AuditAction::Create)));

		sleep(Duration::from_millis(50)).await;
		assert_eq!(sink.count(), 1);
	}

	#[tokio::test]
	async fn test_log_blocking_sends_to_sink() {
		let sink = Arc::new(TestSink::new("test"));
		let service = service(vec![sink.clone()]);

		service
			.log_blocking(entry(AuditAction::Update))
			.await
			.unwrap();

		sleep(Duration::from_millis(50)).await;
		assert_eq!(sink.count(), 1);
	}

	#[tokio::test]
	async fn test_block_policy_queues_entry() {
		let sink = Arc::new(TestSink::new("test"));
		let service = AuditService::new(
			AuditFilterConfig::default(),
			1,
			QueueOverflowPolicy::Block,
			vec![sink.clone()],
		);

		assert!(service.log(entry(AuditAction::Create)));
		assert!(service.log(entry(AuditAction::Create)));

		sleep(Duration::from_millis(50)).await;
		assert_eq!(sink.count(), 2);
	}

	#[tokio::test]
	async fn test_global_filter_blocks_entries() {
		let sink = Arc::new(TestSink::new("test"));
		let filter = AuditFilterConfig {
			include_actions: Some(vec![AuditAction::Delete]),
			exclude_entity_types: None,
		};
		let service = AuditService::new(
			filter,
			10000,
			QueueOverflowPolicy::DropNewest,
			vec![sink.clone()],
		);

		service.log(entry(AuditAction::Create));
		service.log(entry(AuditAction::Delete));

		sleep(Duration::from_millis(50)).await;
		assert_eq!(sink.count(), 1);
	}

	#[tokio::test]
	async fn test_fan_out_to_multiple_sinks() {
		let sink1 = Arc::new(TestSink::new("sink1"));
		let sink2 = Arc::new(TestSink::new("sink2"));
		let service = service(vec![sink1.clone(), sink2.clone()]);

		service.log(entry(AuditAction::Create));

		sleep(Duration::from_millis(50)).await;
		assert_eq!(sink1.count(), 1);
		assert_eq!(sink2.count(), 1);
	}

	#[tokio::test]
	async fn test_failing_sink_does_not_block_others() {
		let good_sink = Arc::new(TestSink::new("good"));
		let failing_sink = Arc::new(FailingSink {
			filter: AuditFilterConfig::default(),
		});
		let service = service(vec![failing_sink, good_sink.clone()]);

		assert!(service.log(entry(AuditAction::Create)));

		sleep(Duration::from_millis(50)).await;
		assert_eq!(good_sink.count(), 1);
	}

	#[tokio::test]
	async fn test_shutdown_drains_queue() {
		let sink = Arc::new(TestSink::new("test"));
		let service = service(vec![sink.clone()]);

		for _ in 0..5 {
			assert!(service.log(entry(AuditAction::Create)));
		}

		service.shutdown().await;
		assert_eq!(sink.count(), 5);
	}

	#[tokio::test]
	async fn test_health_check_reports_failing_sinks() {
		let good_sink = Arc::new(TestSink::new("good"));
		let failing_sink = Arc::new(FailingSink {
			filter: AuditFilterConfig::default(),
		});
		let service = service(vec![failing_sink, good_sink]);

		let failures = service.health_check().await;
		assert_eq!(failures.len(), 1);
		assert!(matches!(
			&failures[0],
			AuditError::SinkError { sink, .. } if sink == "failing"
		));
	}
}
