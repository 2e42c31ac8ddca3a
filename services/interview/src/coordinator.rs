//! Post lifecycle and image consistency.
//!
//! The coordinator is the only component that writes posts. It decides when
//! the blob store is touched so that a stored `image_url` always points at an
//! uploaded object:
//!
//! - create uploads before inserting; an insert failure after a successful
//!   upload leaves an orphaned object, which is logged and counted
//! - update uploads the replacement first, then deletes the superseded image
//!   best-effort, then saves
//! - delete removes the image best-effort, then always removes the record
//!
//! Cleanup failures are never surfaced to callers. Only the uploads that
//! produce a new `image_url` are fatal.

use crate::blob_store::{BlobStore, BlobStoreError, ImageUpload};
use crate::mapper::{self, ExperienceRequest, ExperienceResponse};
use crate::pager::{Page, PageRequest};
use crate::record_store::{InterviewExperience, RecordStore, StoreError};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors surfaced by lifecycle operations
#[derive(Error, Debug)]
pub enum ExperienceError {
    #[error("Interview Experience not found: {0}")]
    NotFound(Uuid),

    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Image store failure: {0}")]
    BlobStore(#[from] BlobStoreError),
}

/// Source of the timestamps stamped on posts
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Coordinates post records with their images
pub struct ExperienceCoordinator {
    records: Arc<dyn RecordStore>,
    images: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    image_path: String,
}

impl ExperienceCoordinator {
    /// Create a coordinator that stores images under `image_path`
    pub fn new(
        records: Arc<dyn RecordStore>,
        images: Arc<dyn BlobStore>,
        image_path: impl Into<String>,
    ) -> Self {
        Self {
            records,
            images,
            clock: Arc::new(SystemClock),
            image_path: image_path.into(),
        }
    }

    /// Replace the clock used for timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a post, uploading its image first when one is supplied
    #[instrument(skip_all, fields(user_email = %request.user_email, has_image = tracing::field::Empty))]
    pub async fn create(
        &self,
        request: ExperienceRequest,
        image: Option<ImageUpload>,
    ) -> Result<ExperienceResponse, ExperienceError> {
        let image = image.filter(|i| !i.is_empty());
        tracing::Span::current().record("has_image", image.is_some());

        let image_url = match image {
            Some(image) => Some(self.upload(image).await?),
            None => None,
        };

        let now = self.stamp();
        let record = mapper::to_new_record(request, image_url.clone(), now);

        let stored = match self.records.insert(record).await {
            Ok(stored) => stored,
            Err(e) => {
                if let Some(ref url) = image_url {
                    warn!(image_url = %url, error = %e, "Insert failed after upload, image orphaned");
                    metrics::counter!("interview.images.orphaned").increment(1);
                }
                return Err(e.into());
            }
        };

        info!(id = %stored.id, "Interview experience created");
        metrics::counter!("interview.experiences.created").increment(1);

        Ok(stored.into())
    }

    /// Look up a single post
    pub async fn get_by_id(&self, id: Uuid) -> Result<ExperienceResponse, ExperienceError> {
        Ok(self.load(id).await?.into())
    }

    /// All posts by an author, newest first
    #[instrument(skip(self))]
    pub async fn search_by_owner(
        &self,
        user_email: &str,
    ) -> Result<Vec<ExperienceResponse>, ExperienceError> {
        let records = self.records.find_by_owner(user_email).await?;
        Ok(records.into_iter().map(ExperienceResponse::from).collect())
    }

    /// All posts about a company, newest first
    #[instrument(skip(self))]
    pub async fn search_by_tag(
        &self,
        company_tag: &str,
    ) -> Result<Vec<ExperienceResponse>, ExperienceError> {
        let records = self.records.find_by_tag(company_tag).await?;
        Ok(records.into_iter().map(ExperienceResponse::from).collect())
    }

    /// One sorted page of posts
    #[instrument(skip(self))]
    pub async fn get_page(
        &self,
        request: &PageRequest,
    ) -> Result<Page<ExperienceResponse>, ExperienceError> {
        let (records, total_elements) = self.records.find_page(request).await?;

        debug!(
            returned = records.len(),
            total_elements = total_elements,
            "Page fetched"
        );

        Ok(Page::new(request, records, total_elements).map(ExperienceResponse::from))
    }

    /// Overwrite a post's fields, replacing its image when a new one is supplied
    #[instrument(skip(self, request, image), fields(has_image = tracing::field::Empty))]
    pub async fn update(
        &self,
        id: Uuid,
        request: ExperienceRequest,
        image: Option<ImageUpload>,
    ) -> Result<ExperienceResponse, ExperienceError> {
        let mut record = self.load(id).await?;

        let image = image.filter(|i| !i.is_empty());
        tracing::Span::current().record("has_image", image.is_some());

        if let Some(image) = image {
            let new_url = self.upload(image).await?;

            if let Some(old_url) = record.attached_image() {
                self.discard_image(old_url, "superseded").await;
            }

            record.image_url = Some(new_url);
        }

        mapper::apply_request(&mut record, request);
        // Never let updated_at fall behind created_at, even with a skewed clock.
        record.updated_at = self.stamp().max(record.created_at);

        let saved = self.records.save(record).await.map_err(|e| match e {
            StoreError::RowMissing(id) => ExperienceError::NotFound(id),
            other => other.into(),
        })?;

        info!(id = %saved.id, "Interview experience updated");
        metrics::counter!("interview.experiences.updated").increment(1);

        Ok(saved.into())
    }

    /// Delete a post and, best-effort, its image
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ExperienceError> {
        let record = self.load(id).await?;

        if let Some(url) = record.attached_image() {
            self.discard_image(url, "post deleted").await;
        }

        self.records.delete(&record).await?;

        info!(id = %id, "Interview experience deleted");
        metrics::counter!("interview.experiences.deleted").increment(1);

        Ok(())
    }

    /// Check that the record store is reachable
    pub async fn health_check(&self) -> Result<(), ExperienceError> {
        self.records.health_check().await?;
        Ok(())
    }

    /// Current time at the record store's microsecond precision, so the
    /// stamps returned to callers match what a later read returns.
    fn stamp(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    async fn load(&self, id: Uuid) -> Result<InterviewExperience, ExperienceError> {
        self.records
            .find_by_id(id)
            .await?
            .ok_or(ExperienceError::NotFound(id))
    }

    async fn upload(&self, image: ImageUpload) -> Result<String, ExperienceError> {
        let url = self.images.upload(&self.image_path, image).await?;
        metrics::counter!("interview.images.uploaded").increment(1);
        Ok(url)
    }

    /// Delete an image that no record should reference any more. Failures
    /// only leak storage, so they are logged and swallowed.
    async fn discard_image(&self, url: &str, reason: &str) {
        match self.images.delete(url).await {
            Ok(()) => {
                debug!(image_url = %url, reason = reason, "Image deleted");
                metrics::counter!("interview.images.deleted").increment(1);
            }
            Err(e) => {
                warn!(image_url = %url, reason = reason, error = %e, "Image cleanup failed");
                metrics::counter!("interview.images.cleanup_failed").increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::{InMemoryBlobStore, MockBlobStore};
    use crate::memory_store::InMemoryRecordStore;
    use crate::pager::SortDirection;
    use crate::record_store::{MockRecordStore, NewInterviewExperience};
    use chrono::{Duration, TimeZone};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use tokio_test::{assert_err, assert_ok};

    const OLD_URL: &str = "https://test-bucket.s3.us-east-1.amazonaws.com/interview-experience/old.jpg";
    const NEW_URL: &str = "https://test-bucket.s3.us-east-1.amazonaws.com/interview-experience/new.jpg";

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
    }

    fn request() -> ExperienceRequest {
        ExperienceRequest {
            user_name: "John Doe".to_string(),
            user_email: "a@x.com".to_string(),
            title: "T".to_string(),
            content: "Content of the interview experience.".to_string(),
            company_tag: "Acme".to_string(),
        }
    }

    fn image(bytes: &[u8]) -> ImageUpload {
        ImageUpload::new("photo.jpg", "image/jpeg", bytes.to_vec())
    }

    fn existing(image_url: Option<&str>) -> InterviewExperience {
        NewInterviewExperience {
            user_name: "Jane Smith".to_string(),
            user_email: "jane@example.com".to_string(),
            title: "Old title".to_string(),
            content: "Old content of the post.".to_string(),
            company_tag: "Initech".to_string(),
            image_url: image_url.map(String::from),
            created_at: created_at(),
            updated_at: created_at(),
        }
        .with_id(Uuid::new_v4())
    }

    fn coordinator(records: MockRecordStore, images: MockBlobStore) -> ExperienceCoordinator {
        ExperienceCoordinator::new(Arc::new(records), Arc::new(images), "interview-experience")
            .with_clock(Arc::new(FixedClock(created_at() + Duration::hours(1))))
    }

    fn upload_failure() -> BlobStoreError {
        BlobStoreError::Upstream(anyhow::anyhow!("S3 upload failed"))
    }

    fn delete_failure() -> BlobStoreError {
        BlobStoreError::Upstream(anyhow::anyhow!("S3 delete failed"))
    }

    #[tokio::test]
    async fn test_create_without_image_never_touches_blob_store() {
        let mut records = MockRecordStore::new();
        records
            .expect_insert()
            .times(1)
            .withf(|r| r.image_url.is_none() && r.created_at == r.updated_at)
            .returning(|r| Ok(r.with_id(Uuid::new_v4())));
        let mut images = MockBlobStore::new();
        images.expect_upload().never();
        images.expect_delete().never();

        let response = assert_ok!(coordinator(records, images).create(request(), None).await);
        assert_eq!(response.image_url, None);
        assert_eq!(response.title, "T");
    }

    #[tokio::test]
    async fn test_create_with_empty_image_skips_upload() {
        let mut records = MockRecordStore::new();
        records
            .expect_insert()
            .times(1)
            .returning(|r| Ok(r.with_id(Uuid::new_v4())));
        let mut images = MockBlobStore::new();
        images.expect_upload().never();

        let response = assert_ok!(
            coordinator(records, images)
                .create(request(), Some(image(b"")))
                .await
        );
        assert_eq!(response.image_url, None);
    }

    #[tokio::test]
    async fn test_create_uploads_before_insert() {
        let mut seq = Sequence::new();
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|path, image| path == "interview-experience" && image.bytes == b"jpeg")
            .returning(|_, _| Ok(NEW_URL.to_string()));
        let mut records = MockRecordStore::new();
        records
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.image_url.as_deref() == Some(NEW_URL))
            .returning(|r| Ok(r.with_id(Uuid::new_v4())));

        let response = assert_ok!(
            coordinator(records, images)
                .create(request(), Some(image(b"jpeg")))
                .await
        );
        assert_eq!(response.image_url.as_deref(), Some(NEW_URL));
        assert_eq!(response.created_at, created_at() + Duration::hours(1));
    }

    #[tokio::test]
    async fn test_create_upload_failure_is_fatal() {
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .returning(|_, _| Err(upload_failure()));
        let mut records = MockRecordStore::new();
        records.expect_insert().never();

        let err = assert_err!(
            coordinator(records, images)
                .create(request(), Some(image(b"jpeg")))
                .await
        );
        assert!(matches!(err, ExperienceError::BlobStore(_)));
    }

    #[tokio::test]
    async fn test_create_insert_failure_does_not_compensate() {
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .returning(|_, _| Ok(NEW_URL.to_string()));
        images.expect_delete().never();
        let mut records = MockRecordStore::new();
        records
            .expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::Upstream(anyhow::anyhow!("connection refused"))));

        let err = assert_err!(
            coordinator(records, images)
                .create(request(), Some(image(b"jpeg")))
                .await
        );
        assert!(matches!(err, ExperienceError::Store(_)));
    }

    #[tokio::test]
    async fn test_get_by_id_absent_is_not_found() {
        let id = Uuid::new_v4();
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(None));

        let err = assert_err!(coordinator(records, MockBlobStore::new()).get_by_id(id).await);
        assert!(matches!(err, ExperienceError::NotFound(missing) if missing == id));
        assert_eq!(err.to_string(), format!("Interview Experience not found: {id}"));
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_owner()
            .withf(|email| email == "nobody@example.com")
            .returning(|_| Ok(Vec::new()));
        records.expect_find_by_tag().returning(|_| Ok(Vec::new()));

        let coordinator = coordinator(records, MockBlobStore::new());
        assert!(assert_ok!(coordinator.search_by_owner("nobody@example.com").await).is_empty());
        assert!(assert_ok!(coordinator.search_by_tag("Initech").await).is_empty());
    }

    #[tokio::test]
    async fn test_update_without_image_keeps_image_and_created_at() {
        let record = existing(Some(OLD_URL));
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(record.clone())));
        records
            .expect_save()
            .times(1)
            .withf(|r| r.image_url.as_deref() == Some(OLD_URL))
            .returning(Ok);
        let mut images = MockBlobStore::new();
        images.expect_upload().never();
        images.expect_delete().never();

        let response = assert_ok!(coordinator(records, images).update(id, request(), None).await);

        assert_eq!(response.image_url.as_deref(), Some(OLD_URL));
        assert_eq!(response.created_at, created_at());
        assert_eq!(response.updated_at, created_at() + Duration::hours(1));
        assert_eq!(response.title, "T");
        assert_eq!(response.user_email, "a@x.com");
        assert_eq!(response.company_tag, "Acme");
    }

    #[tokio::test]
    async fn test_update_replaces_image() {
        let record = existing(Some(OLD_URL));
        let id = record.id;
        let mut seq = Sequence::new();
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(NEW_URL.to_string()));
        images
            .expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|url| url == OLD_URL)
            .returning(|_| Ok(()));
        records
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|r| r.image_url.as_deref() == Some(NEW_URL))
            .returning(Ok);

        let response = assert_ok!(
            coordinator(records, images)
                .update(id, request(), Some(image(b"png")))
                .await
        );
        assert_eq!(response.image_url.as_deref(), Some(NEW_URL));
    }

    #[tokio::test]
    async fn test_stamps_truncated_to_microseconds() {
        let at = created_at() + Duration::nanoseconds(123_456_789);
        let store = Arc::new(InMemoryRecordStore::new());
        let coordinator = ExperienceCoordinator::new(
            store.clone(),
            Arc::new(InMemoryBlobStore::new("test-bucket")),
            "interview-experience",
        )
        .with_clock(Arc::new(FixedClock(at)));

        let created = assert_ok!(coordinator.create(request(), None).await);
        assert_eq!(created.created_at.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(created.updated_at, created.created_at);

        let updated = assert_ok!(coordinator.update(created.id, request(), None).await);
        assert_eq!(updated.updated_at.timestamp_subsec_nanos() % 1_000, 0);

        let fetched = assert_ok!(coordinator.get_by_id(created.id).await);
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.updated_at, updated.updated_at);
    }

    #[tokio::test]
    async fn test_system_clock_stamps_are_whole_microseconds() {
        let coordinator = ExperienceCoordinator::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryBlobStore::new("test-bucket")),
            "interview-experience",
        );

        for _ in 0..20 {
            let created = assert_ok!(coordinator.create(request(), None).await);
            assert_eq!(created.created_at.timestamp_subsec_nanos() % 1_000, 0);
        }
    }

    #[tokio::test]
    async fn test_update_swallows_old_image_delete_failure() {
        let record = existing(Some(OLD_URL));
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        records.expect_save().times(1).returning(Ok);
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .returning(|_, _| Ok(NEW_URL.to_string()));
        images
            .expect_delete()
            .times(1)
            .returning(|_| Err(delete_failure()));

        let response = assert_ok!(
            coordinator(records, images)
                .update(id, request(), Some(image(b"png")))
                .await
        );
        assert_eq!(response.image_url.as_deref(), Some(NEW_URL));
    }

    #[tokio::test]
    async fn test_update_new_image_without_old_image_only_uploads() {
        let record = existing(None);
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        records.expect_save().times(1).returning(Ok);
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .returning(|_, _| Ok(NEW_URL.to_string()));
        images.expect_delete().never();

        assert_ok!(
            coordinator(records, images)
                .update(id, request(), Some(image(b"png")))
                .await
        );
    }

    #[tokio::test]
    async fn test_update_upload_failure_keeps_old_image() {
        let record = existing(Some(OLD_URL));
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        records.expect_save().never();
        let mut images = MockBlobStore::new();
        images
            .expect_upload()
            .times(1)
            .returning(|_, _| Err(upload_failure()));
        images.expect_delete().never();

        let err = assert_err!(
            coordinator(records, images)
                .update(id, request(), Some(image(b"png")))
                .await
        );
        assert!(matches!(err, ExperienceError::BlobStore(_)));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let mut records = MockRecordStore::new();
        records.expect_find_by_id().returning(|_| Ok(None));
        records.expect_save().never();
        let mut images = MockBlobStore::new();
        images.expect_upload().never();

        let err = assert_err!(
            coordinator(records, images)
                .update(Uuid::new_v4(), request(), Some(image(b"png")))
                .await
        );
        assert!(matches!(err, ExperienceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_clamps_updated_at_to_created_at() {
        let record = existing(None);
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        records.expect_save().returning(Ok);

        let coordinator =
            ExperienceCoordinator::new(Arc::new(records), Arc::new(MockBlobStore::new()), "p")
                .with_clock(Arc::new(FixedClock(created_at() - Duration::minutes(5))));

        let response = assert_ok!(coordinator.update(id, request(), None).await);
        assert_eq!(response.updated_at, response.created_at);
    }

    #[tokio::test]
    async fn test_update_record_deleted_concurrently_is_not_found() {
        let record = existing(None);
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        records
            .expect_save()
            .returning(|r| Err(StoreError::RowMissing(r.id)));

        let err = assert_err!(
            coordinator(records, MockBlobStore::new())
                .update(id, request(), None)
                .await
        );
        assert!(matches!(err, ExperienceError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_delete_with_image_swallows_blob_failure() {
        let record = existing(Some(OLD_URL));
        let id = record.id;
        let mut seq = Sequence::new();
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        let mut images = MockBlobStore::new();
        images
            .expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|url| url == OLD_URL)
            .returning(|_| Err(delete_failure()));
        records
            .expect_delete()
            .times(1)
            .in_sequence(&mut seq)
            .withf(move |r| r.id == id)
            .returning(|_| Ok(()));

        assert_ok!(coordinator(records, images).delete(id).await);
    }

    #[tokio::test]
    async fn test_delete_with_empty_image_url_skips_blob_store() {
        let record = existing(Some(""));
        let id = record.id;
        let mut records = MockRecordStore::new();
        records
            .expect_find_by_id()
            .returning(move |_| Ok(Some(record.clone())));
        records.expect_delete().times(1).returning(|_| Ok(()));
        let mut images = MockBlobStore::new();
        images.expect_delete().never();

        assert_ok!(coordinator(records, images).delete(id).await);
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let mut records = MockRecordStore::new();
        records.expect_find_by_id().returning(|_| Ok(None));
        records.expect_delete().never();

        let err = assert_err!(
            coordinator(records, MockBlobStore::new())
                .delete(Uuid::new_v4())
                .await
        );
        assert!(matches!(err, ExperienceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_then_get_returns_uploaded_url() {
        let images = Arc::new(InMemoryBlobStore::new("test-bucket"));
        let coordinator = ExperienceCoordinator::new(
            Arc::new(InMemoryRecordStore::new()),
            images.clone(),
            "interview-experience",
        );

        let created = assert_ok!(coordinator.create(request(), Some(image(b"b"))).await);
        let url = created.image_url.clone().unwrap();
        assert!(images.contains(&url));

        let fetched = assert_ok!(coordinator.get_by_id(created.id).await);
        assert_eq!(fetched.image_url.as_deref(), Some(url.as_str()));
        assert_eq!(fetched.title, "T");
        assert_eq!(fetched.user_email, "a@x.com");
        assert_eq!(fetched.company_tag, "Acme");

        assert_ok!(coordinator.delete(created.id).await);
        assert!(!images.contains(&url));
        assert!(matches!(
            coordinator.get_by_id(created.id).await,
            Err(ExperienceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replacing_image_leaves_single_object() {
        let images = Arc::new(InMemoryBlobStore::new("test-bucket"));
        let coordinator = ExperienceCoordinator::new(
            Arc::new(InMemoryRecordStore::new()),
            images.clone(),
            "interview-experience",
        );

        let created = assert_ok!(coordinator.create(request(), Some(image(b"one"))).await);
        let updated = assert_ok!(
            coordinator
                .update(created.id, request(), Some(image(b"two")))
                .await
        );

        assert_ne!(created.image_url, updated.image_url);
        assert_eq!(images.len(), 1);
        assert!(images.contains(updated.image_url.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_get_page_over_twenty_five_records() {
        let coordinator = ExperienceCoordinator::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryBlobStore::new("test-bucket")),
            "interview-experience",
        );
        for i in 0..25 {
            let request = ExperienceRequest {
                title: format!("Post {i}"),
                ..request()
            };
            assert_ok!(coordinator.create(request, None).await);
        }

        let first = PageRequest::new(0, 10, "updatedAt", SortDirection::Ascending).unwrap();
        let page = assert_ok!(coordinator.get_page(&first).await);
        assert_eq!(page.content.len(), 10);
        assert_eq!(page.total_elements, 25);
        assert_eq!(page.total_pages, 3);
        assert!(!page.last_page);

        let last = PageRequest::new(2, 10, "updatedAt", SortDirection::Ascending).unwrap();
        let page = assert_ok!(coordinator.get_page(&last).await);
        assert_eq!(page.content.len(), 5);
        assert!(page.last_page);
    }

    #[tokio::test]
    async fn test_get_page_unknown_sort_field_is_store_error() {
        let coordinator = ExperienceCoordinator::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryBlobStore::new("test-bucket")),
            "interview-experience",
        );
        let request = PageRequest::new(0, 10, "favouriteColour", SortDirection::Ascending).unwrap();

        let err = assert_err!(coordinator.get_page(&request).await);
        assert!(matches!(
            err,
            ExperienceError::Store(StoreError::InvalidSortField(_))
        ));
    }
}
