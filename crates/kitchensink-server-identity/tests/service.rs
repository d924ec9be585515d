// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kitchensink_common_config::Secret;
use kitchensink_server_audit::{
	AuditAction, AuditEntry, AuditFilterConfig, AuditService, AuditSink, AuditSinkError,
	QueueOverflowPolicy,
};
use kitchensink_server_crypto::{generate_key, FieldCipher, KeyRing, PiiHasher};
use kitchensink_server_identity::{
	ErrorKind, IdentityError, IdentityService, IdentityStore, Member, MemberRequest,
	MemoryIdentityStore, OperationContext, PiiField, RecordMapper, User, UserRequest,
};

#[derive(Default)]
struct RecordingSink {
	filter: AuditFilterConfig,
	entries: Mutex<Vec<Arc<AuditEntry>>>,
}

impl RecordingSink {
	fn entries(&self) -> Vec<Arc<AuditEntry>> {
		self.entries.lock().unwrap().clone()
	}

	async fn wait_for(&self, count: usize) -> Vec<Arc<AuditEntry>> {
		for _ in 0..100 {
			if self.entries.lock().unwrap().len() >= count {
				break;
			}
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		self.entries()
	}
}

#[async_trait]
impl AuditSink for RecordingSink {
	fn name(&self) -> &str {
		"recording"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditEntry>) -> Result<(), AuditSinkError> {
		self.entries.lock().unwrap().push(entry);
		Ok(())
	}
}

#[derive(Default)]
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
		Err(AuditSinkError::Permanent("audit table is gone".to_string()))
	}
}

struct Harness<R: kitchensink_server_identity::IdentityRecord> {
	service: IdentityService<R, MemoryIdentityStore<R>>,
	store: Arc<MemoryIdentityStore<R>>,
	sink: Arc<RecordingSink>,
	cipher: Arc<FieldCipher>,
}

fn harness<R: kitchensink_server_identity::IdentityRecord>(
	extra_sinks: Vec<Arc<dyn AuditSink>>,
) -> Harness<R> {
	let hasher = PiiHasher::new(Secret::new("integration-hash-secret".to_string())).unwrap();
	let cipher = Arc::new(FieldCipher::new(KeyRing::new(1, &generate_key()).unwrap()));
	let mapper = RecordMapper::new(Arc::new(hasher), Arc::clone(&cipher));

	let sink = Arc::new(RecordingSink::default());
	let mut sinks: Vec<Arc<dyn AuditSink>> = extra_sinks;
	sinks.push(sink.clone());
	let audit = Arc::new(AuditService::new(
		AuditFilterConfig::default(),
		1000,
		QueueOverflowPolicy::DropNewest,
		sinks,
	));

	let store = Arc::new(MemoryIdentityStore::new());
	Harness {
		service: IdentityService::new(Arc::clone(&store), mapper, audit),
		store,
		sink,
		cipher,
	}
}

fn member_request(name: &str, email: &str, phone: &str) -> MemberRequest {
	MemberRequest {
		name: Some(name.to_string()),
		email: Some(email.to_string()),
		phone_number: Some(phone.to_string()),
		status: None,
	}
}

#[tokio::test]
async fn duplicate_email_is_a_conflict_on_email() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	h.service
		.create(&ctx, member_request("Ann", "a@x.com", "1234567890"))
		.await
		.unwrap();

	let err = h
		.service
		.create(&ctx, member_request("Bob", "A@X.com ", "1234567891"))
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		IdentityError::ResourceConflict {
			field: PiiField::Email
		}
	));
	assert_eq!(err.public_body().field, Some("email"));

	h.service
		.create(&ctx, member_request("Bob", "b@x.com", "1234567891"))
		.await
		.unwrap();
	assert_eq!(h.store.len().await, 2);
}

#[tokio::test]
async fn duplicate_phone_is_a_conflict_on_phone() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	h.service
		.create(&ctx, member_request("Ann", "a@x.com", "1234567890"))
		.await
		.unwrap();
	let err = h
		.service
		.create(&ctx, member_request("Bob", "b@x.com", "123-456-7890"))
		.await
		.unwrap_err();
	assert_eq!(err.field(), Some("phone_number"));
	assert_eq!(err.kind(), ErrorKind::ResourceConflict);
}

#[tokio::test]
async fn create_is_audited_with_hashes() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system()
		.with_actor("admin@kitchensink")
		.with_correlation_id("req-1")
		.with_ip_address("10.1.2.3");

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	assert_eq!(created.body.email.as_deref(), Some("ann@x.com"));

	let entries = h.sink.wait_for(1).await;
	assert_eq!(entries.len(), 1);
	let entry = &entries[0];
	assert_eq!(entry.action, AuditAction::Create);
	assert_eq!(entry.entity_type, "member");
	assert_eq!(entry.entity_id, created.body.id.to_string());
	assert_eq!(entry.performed_by, "admin@kitchensink");
	assert_eq!(entry.correlation_id.as_deref(), Some("req-1"));
	assert_eq!(entry.ip_address.as_deref(), Some("10.1.2.3"));

	let stored = h.store.find_by_id(created.body.id).await.unwrap().unwrap();
	let email = stored.email.unwrap();
	assert_eq!(
		entry.changed_fields["email"].new.as_deref(),
		Some(email.hash())
	);
	let json = serde_json::to_string(&entry.changed_fields).unwrap();
	assert!(!json.contains("ann@x.com"));
	assert!(!json.contains(email.encrypted().as_str()));
}

#[tokio::test]
async fn name_only_update_audits_only_name() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	let id = created.body.id;
	let before = h.store.find_by_id(id).await.unwrap().unwrap();

	let patch = MemberRequest {
		name: Some("Anna".to_string()),
		..Default::default()
	};
	let updated = h.service.update(&ctx, id, patch).await.unwrap();
	assert_eq!(updated.body.name, "Anna");

	let after = h.store.find_by_id(id).await.unwrap().unwrap();
	assert_eq!(after.email, before.email);
	assert_eq!(after.phone_number, before.phone_number);

	let entries = h.sink.wait_for(2).await;
	let update = entries
		.iter()
		.find(|e| e.action == AuditAction::Update)
		.unwrap();
	assert_eq!(update.changed_fields.len(), 1);
	assert_eq!(update.changed_fields["name"].old.as_deref(), Some("Ann"));
	assert_eq!(update.changed_fields["name"].new.as_deref(), Some("Anna"));
}

#[tokio::test]
async fn email_update_audits_new_hash_only() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	let id = created.body.id;
	let old_hash = h
		.store
		.find_by_id(id)
		.await
		.unwrap()
		.unwrap()
		.email
		.unwrap()
		.hash()
		.to_string();

	let patch = MemberRequest {
		email: Some("ann@new.com".to_string()),
		..Default::default()
	};
	let updated = h.service.update(&ctx, id, patch).await.unwrap();
	assert_eq!(updated.body.email.as_deref(), Some("ann@new.com"));

	let stored = h.store.find_by_id(id).await.unwrap().unwrap();
	let email = stored.email.unwrap();

	let entries = h.sink.wait_for(2).await;
	let update = entries
		.iter()
		.find(|e| e.action == AuditAction::Update)
		.unwrap();
	assert_eq!(update.changed_fields.keys().collect::<Vec<_>>(), vec!["email"]);
	assert_eq!(update.changed_fields["email"].old.as_deref(), Some(old_hash.as_str()));
	assert_eq!(update.changed_fields["email"].new.as_deref(), Some(email.hash()));

	let json = serde_json::to_string(&update.changed_fields).unwrap();
	assert!(!json.contains("ann@new.com"));
	assert!(!json.contains("ann@x.com"));
	assert!(!json.contains(email.encrypted().as_str()));
}

#[tokio::test]
async fn update_to_taken_email_conflicts() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	h.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	let bob = h
		.service
		.create(&ctx, member_request("Bob", "bob@x.com", "1234567891"))
		.await
		.unwrap();

	let patch = MemberRequest {
		email: Some("ann@x.com".to_string()),
		..Default::default()
	};
	let err = h.service.update(&ctx, bob.body.id, patch).await.unwrap_err();
	assert_eq!(err.field(), Some("email"));

	let unchanged = h.service.get(bob.body.id).await.unwrap();
	assert_eq!(unchanged.body.email.as_deref(), Some("bob@x.com"));
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_write() {
	let h = harness::<Member>(vec![Arc::new(FailingSink::default())]);
	let ctx = OperationContext::system();

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await;
	assert!(created.is_ok());
	assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn concurrent_creates_produce_independent_entries() {
	let h = Arc::new(harness::<Member>(vec![]));
	let ctx = OperationContext::system();

	let a = {
		let h = Arc::clone(&h);
		let ctx = ctx.clone().with_correlation_id("req-a");
		tokio::spawn(async move {
			h.service
				.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
				.await
		})
	};
	let b = {
		let h = Arc::clone(&h);
		let ctx = ctx.clone().with_correlation_id("req-b");
		tokio::spawn(async move {
			h.service
				.create(&ctx, member_request("Bob", "bob@x.com", "1234567891"))
				.await
		})
	};
	let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

	let entries = h.sink.wait_for(2).await;
	assert_eq!(entries.len(), 2);
	for entry in &entries {
		assert_eq!(entry.action, AuditAction::Create);
		let (expected_id, expected_name) = match entry.correlation_id.as_deref() {
			Some("req-a") => (a.body.id, "Ann"),
			Some("req-b") => (b.body.id, "Bob"),
			other => panic!("unexpected correlation id {other:?}"),
		};
		assert_eq!(entry.entity_id, expected_id.to_string());
		assert_eq!(
			entry.changed_fields["name"].new.as_deref(),
			Some(expected_name)
		);
	}
}

#[tokio::test]
async fn many_concurrent_creates_all_succeed() {
	let h = Arc::new(harness::<Member>(vec![]));

	let tasks = (0..20).map(|i| {
		let h = Arc::clone(&h);
		async move {
			h.service
				.create(
					&OperationContext::system(),
					member_request("Member", &format!("m{i}@x.com"), &format!("12345678{i:02}")),
				)
				.await
		}
	});
	let results = futures::future::join_all(tasks).await;

	assert!(results.iter().all(|r| r.is_ok()));
	assert_eq!(h.store.len().await, 20);
	assert_eq!(h.sink.wait_for(20).await.len(), 20);
}

#[tokio::test]
async fn invalid_request_writes_nothing() {
	let h = harness::<Member>(vec![]);
	let err = h
		.service
		.create(
			&OperationContext::system(),
			member_request("R2D2", "r2@x.com", "1234567890"),
		)
		.await
		.unwrap_err();

	assert_eq!(err.kind(), ErrorKind::Validation);
	assert_eq!(err.field(), Some("name"));
	assert!(h.store.is_empty().await);
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(h.sink.entries().is_empty());
}

#[tokio::test]
async fn update_with_blanked_fields_is_rejected_and_writes_nothing() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	let id = created.body.id;
	let before = h.store.find_by_id(id).await.unwrap().unwrap();
	h.sink.wait_for(1).await;

	for (patch, field) in [
		(
			MemberRequest {
				name: Some("<b></b>".to_string()),
				..Default::default()
			},
			"name",
		),
		(
			MemberRequest {
				email: Some("   ".to_string()),
				..Default::default()
			},
			"email",
		),
		(
			MemberRequest {
				phone_number: Some("---".to_string()),
				..Default::default()
			},
			"phone_number",
		),
	] {
		let err = h.service.update(&ctx, id, patch).await.unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Validation);
		assert_eq!(err.field(), Some(field));
	}

	let after = h.store.find_by_id(id).await.unwrap().unwrap();
	assert_eq!(after.name, before.name);
	assert_eq!(after.email, before.email);
	assert_eq!(after.phone_number, before.phone_number);
	assert_eq!(after.updated_at, before.updated_at);

	tokio::time::sleep(Duration::from_millis(50)).await;
	let entries = h.sink.entries();
	assert_eq!(entries.len(), 1);
	assert_eq!(entries[0].action, AuditAction::Create);
}

#[tokio::test]
async fn delete_is_audited_and_missing_record_is_not_found() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	h.service.delete(&ctx, created.body.id).await.unwrap();

	let entries = h.sink.wait_for(2).await;
	let delete = entries
		.iter()
		.find(|e| e.action == AuditAction::Delete)
		.unwrap();
	assert!(delete.changed_fields.is_empty());
	assert_eq!(delete.entity_id, created.body.id.to_string());

	let err = h.service.delete(&ctx, created.body.id).await.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::NotFound);
	assert_eq!(
		h.service.get(created.body.id).await.unwrap_err().kind(),
		ErrorKind::NotFound
	);
}

#[tokio::test]
async fn lookups_use_normalized_hashes() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	h.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();

	let found = h.service.find_by_email("  ANN@X.com").await.unwrap().unwrap();
	assert_eq!(found.body.name, "Ann");
	assert!(h.service.email_exists("ann@x.com").await.unwrap());
	assert!(!h.service.email_exists("other@x.com").await.unwrap());
	assert!(h.service.phone_number_exists("(123) 456-7890").await.unwrap());
	assert!(h
		.service
		.find_by_phone_number("0000000000")
		.await
		.unwrap()
		.is_none());

	let err = h.service.find_by_email("   ").await.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn list_and_search_are_ordered_by_name() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();
	for (i, name) in ["Zoe", "Ann", "Joanna"].iter().enumerate() {
		h.service
			.create(
				&ctx,
				member_request(name, &format!("{i}@x.com"), &format!("123456789{i}")),
			)
			.await
			.unwrap();
	}

	let names: Vec<_> = h
		.service
		.list()
		.await
		.unwrap()
		.into_iter()
		.map(|m| m.body.name)
		.collect();
	assert_eq!(names, vec!["Ann", "Joanna", "Zoe"]);

	let found: Vec<_> = h
		.service
		.search_by_name("ann")
		.await
		.unwrap()
		.into_iter()
		.map(|m| m.body.name)
		.collect();
	assert_eq!(found, vec!["Ann", "Joanna"]);
}

#[tokio::test]
async fn rotation_marks_stale_and_next_write_refreshes() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();

	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();
	let id = created.body.id;
	assert!(!created.needs_reencryption());

	h.cipher.rotate(2, &generate_key()).unwrap();

	let read = h.service.get(id).await.unwrap();
	assert_eq!(read.stale_fields, vec![PiiField::Email, PiiField::PhoneNumber]);
	let stored = h.store.find_by_id(id).await.unwrap().unwrap();
	assert_eq!(stored.email.as_ref().unwrap().encrypted().key_version(), Some(1));

	let patch = MemberRequest {
		name: Some("Anna".to_string()),
		..Default::default()
	};
	let updated = h.service.update(&ctx, id, patch).await.unwrap();
	assert!(!updated.needs_reencryption());
	assert_eq!(updated.body.email.as_deref(), Some("ann@x.com"));

	let entries = h.sink.wait_for(2).await;
	let update = entries
		.iter()
		.find(|e| e.action == AuditAction::Update)
		.unwrap();
	assert_eq!(update.changed_fields.keys().collect::<Vec<_>>(), vec!["name"]);
}

#[tokio::test]
async fn reencrypt_sweep_rewrites_stale_records() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();
	for i in 0..3 {
		h.service
			.create(
				&ctx,
				member_request("Ann", &format!("{i}@x.com"), &format!("123456789{i}")),
			)
			.await
			.unwrap();
	}

	h.cipher.rotate(2, &generate_key()).unwrap();
	let report = h.service.reencrypt_stale().await.unwrap();
	assert_eq!(report.scanned, 3);
	assert_eq!(report.rewritten, 3);
	assert_eq!(report.failed, 0);

	for member in h.service.list().await.unwrap() {
		assert!(!member.needs_reencryption());
	}

	let again = h.service.reencrypt_stale().await.unwrap();
	assert_eq!(again.rewritten, 0);

	assert_eq!(h.sink.wait_for(3).await.len(), 3);
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(h.sink.entries().len(), 3);
}

#[tokio::test]
async fn activating_old_key_clears_staleness() {
	let h = harness::<Member>(vec![]);
	let ctx = OperationContext::system();
	let created = h
		.service
		.create(&ctx, member_request("Ann", "ann@x.com", "1234567890"))
		.await
		.unwrap();

	h.cipher.rotate(2, &generate_key()).unwrap();
	assert!(h.service.get(created.body.id).await.unwrap().needs_reencryption());

	h.cipher.activate(1).unwrap();
	assert!(!h.service.get(created.body.id).await.unwrap().needs_reencryption());
}

#[tokio::test]
async fn user_records_share_the_pipeline() {
	let h = harness::<User>(vec![]);
	let ctx = OperationContext::system();

	let request = UserRequest {
		name: Some("Priya Sharma".to_string()),
		email: Some("priya@example.in".to_string()),
		isd_code: Some("+91".to_string()),
		phone_number: Some("9876543210".to_string()),
		date_of_birth: Some("15-08-1990".to_string()),
		city: Some("Pune".to_string()),
		..Default::default()
	};
	let created = h.service.create(&ctx, request).await.unwrap();
	assert_eq!(created.body.date_of_birth.as_deref(), Some("15-08-1990"));
	assert_eq!(created.body.phone_number.as_deref(), Some("9876543210"));

	let patch = UserRequest {
		city: Some("Mumbai".to_string()),
		..Default::default()
	};
	h.service.update(&ctx, created.body.id, patch).await.unwrap();

	let entries = h.sink.wait_for(2).await;
	let update = entries
		.iter()
		.find(|e| e.action == AuditAction::Update)
		.unwrap();
	assert_eq!(update.entity_type, "user");
	assert_eq!(update.changed_fields.keys().collect::<Vec<_>>(), vec!["city"]);

	let bad = UserRequest {
		phone_number: Some("1234567890".to_string()),
		..Default::default()
	};
	let err = h
		.service
		.update(&ctx, created.body.id, bad)
		.await
		.unwrap_err();
	assert_eq!(err.field(), Some("phone_number"));
}
