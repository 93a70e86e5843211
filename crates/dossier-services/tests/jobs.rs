mod common;

use std::sync::Arc;

use common::*;
use dossier_core::models::NewFileMetadata;
use dossier_core::{RequestContext, StorageBackend};
use dossier_db::{InMemoryMetadataStore, MetadataStore};
use dossier_services::{DigestOutcome, JobScheduler, NoticeCategory};

async fn upload_many(h: &Harness, count: usize) -> Vec<(i64, String)> {
    let ctx = RequestContext::new();
    let mut uploaded = Vec::new();
    for _ in 0..count {
        let file = h
            .services
            .orchestrator
            .upload_file(request(png(512), "foto", false), &ctx)
            .await
            .unwrap();
        uploaded.push((file.file_id, file.storage_key));
    }
    uploaded
}

#[tokio::test]
async fn removes_only_rows_whose_object_is_gone() {
    let h = harness();
    let files = upload_many(&h, 5).await;
    let (gone_id, gone_key) = files[2].clone();
    h.remote.inner().delete(&gone_key, "t").await.unwrap();

    let report = h.services.reconciliation.run(&RequestContext::new()).await;

    assert_eq!(report.scanned, 5);
    assert_eq!(report.removed, 1);
    assert_eq!(report.unverified, 0);
    assert!(report.completed);

    let remaining: Vec<i64> = h.metadata.all().await.iter().map(|m| m.id).collect();
    assert_eq!(remaining.len(), 4);
    assert!(!remaining.contains(&gone_id));
    assert!(h.services.cache.get(gone_id).is_none());
    assert!(h
        .services
        .orchestrator
        .get_file(gone_id, &RequestContext::new())
        .await
        .unwrap_err()
        .is_not_found());

    let digest = h.services.notices.drain();
    assert_eq!(digest.entries[&NoticeCategory::Deletion].len(), 1);
}

#[tokio::test]
async fn presence_falls_back_to_a_download_without_exists_support() {
    let metadata = InMemoryMetadataStore::new();
    let remote: Arc<dyn dossier_storage::Storage> = Arc::new(BasicStorage::new(memory_provider(
        StorageBackend::S3,
        "test-bucket",
    )));
    let h = harness_over(
        test_config(),
        StorageBackend::S3,
        metadata.clone(),
        Arc::new(metadata),
        remote,
    );
    let files = upload_many(&h, 2).await;
    let (kept_id, _) = files[0].clone();
    let (gone_id, gone_key) = files[1].clone();
    h.remote.inner().delete(&gone_key, "t").await.unwrap();

    let report = h.services.reconciliation.run(&RequestContext::new()).await;

    assert_eq!(report.scanned, 2);
    assert_eq!(report.removed, 1);
    assert_eq!(report.unverified, 0);
    let remaining: Vec<i64> = h.metadata.all().await.iter().map(|m| m.id).collect();
    assert_eq!(remaining, vec![kept_id]);
    assert!(!remaining.contains(&gone_id));
}

#[tokio::test]
async fn backend_errors_leave_rows_unverified() {
    let h = harness();
    upload_many(&h, 3).await;
    h.remote.set_failing(true);

    let report = h.services.reconciliation.run(&RequestContext::new()).await;

    assert_eq!(report.scanned, 3);
    assert_eq!(report.removed, 0);
    assert_eq!(report.unverified, 3);
    assert_eq!(h.metadata.count().await.unwrap(), 3);
}

#[tokio::test]
async fn unconfigured_backend_is_never_judged_absent() {
    let h = harness();
    h.metadata
        .create(NewFileMetadata {
            path: "photo/1/elsewhere.png".to_string(),
            original_name: "elsewhere.png".to_string(),
            declared_mime_type: None,
            mime_type: "image/png".to_string(),
            size: 10,
            storage_backend: StorageBackend::Gcs,
            iv: None,
            sensitive: false,
            owner_id: OWNER,
            association: "photo".to_string(),
        })
        .await
        .unwrap();

    let report = h.services.reconciliation.run(&RequestContext::new()).await;

    assert_eq!(report.unverified, 1);
    assert_eq!(report.removed, 0);
    assert_eq!(h.metadata.count().await.unwrap(), 1);
}

#[tokio::test]
async fn unreadable_page_stops_the_sweep() {
    let h = harness();
    upload_many(&h, 2).await;
    h.metadata.set_unavailable(true);

    let report = h.services.reconciliation.run(&RequestContext::new()).await;

    assert_eq!(report.scanned, 0);
    assert!(!report.completed);
}

#[tokio::test]
async fn digest_summarizes_and_clears() {
    let h = harness();
    let ctx = RequestContext::new();
    let sensitive = h
        .services
        .orchestrator
        .upload_file(request(pdf(1024), "documento", true), &ctx)
        .await
        .unwrap();
    h.services
        .orchestrator
        .delete_file(sensitive.file_id, &ctx)
        .await
        .unwrap();

    assert_eq!(h.services.digest.run().await, DigestOutcome::Sent { notices: 2 });

    let sent = h.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("Sensitive uploads (1)"));
    assert!(sent[0].1.contains("Deletions (1)"));

    assert_eq!(h.services.digest.run().await, DigestOutcome::Skipped);
    assert_eq!(h.outbox.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduled_jobs_stop_on_shutdown() {
    let h = harness();
    let mut scheduler = JobScheduler::new();
    h.services.schedule_jobs(&test_config(), &mut scheduler);
    assert_eq!(scheduler.job_count(), 2);

    scheduler.shutdown().await;
    assert!(h.outbox.sent().is_empty());
}
