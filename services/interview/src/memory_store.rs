use crate::pager::{PageRequest, SortDirection};
use crate::record_store::{
    InterviewExperience, NewInterviewExperience, RecordStore, SortField, StoreError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use uuid::Uuid;

/// In-memory record store. Insertion order is the native order.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<InterviewExperience>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn newest_first_where<F>(&self, predicate: F) -> Vec<InterviewExperience>
    where
        F: Fn(&InterviewExperience) -> bool,
    {
        let mut matches: Vec<InterviewExperience> = self
            .records
            .read()
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches
    }
}

fn compare_by(field: SortField, a: &InterviewExperience, b: &InterviewExperience) -> Ordering {
    match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::UserName => a.user_name.cmp(&b.user_name),
        SortField::UserEmail => a.user_email.cmp(&b.user_email),
        SortField::Title => a.title.cmp(&b.title),
        SortField::Content => a.content.cmp(&b.content),
        SortField::CompanyTag => a.company_tag.cmp(&b.company_tag),
        SortField::ImageUrl => a.image_url.cmp(&b.image_url),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert(&self, record: NewInterviewExperience) -> Result<InterviewExperience, StoreError> {
        let stored = record.with_id(Uuid::new_v4());
        self.records.write().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InterviewExperience>, StoreError> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_owner(&self, user_email: &str) -> Result<Vec<InterviewExperience>, StoreError> {
        Ok(self.newest_first_where(|r| r.user_email == user_email))
    }

    async fn find_by_tag(&self, company_tag: &str) -> Result<Vec<InterviewExperience>, StoreError> {
        Ok(self.newest_first_where(|r| r.company_tag == company_tag))
    }

    async fn find_page(
        &self,
        request: &PageRequest,
    ) -> Result<(Vec<InterviewExperience>, u64), StoreError> {
        let field = SortField::resolve(request.sort_field())?;

        let mut sorted = self.records.read().clone();
        sorted.sort_by(|a, b| {
            let primary = match request.direction() {
                SortDirection::Ascending => compare_by(field, a, b),
                SortDirection::Descending => compare_by(field, b, a),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let total = sorted.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let page = sorted
            .into_iter()
            .skip(offset)
            .take(request.page_size() as usize)
            .collect();

        Ok((page, total))
    }

    async fn save(&self, record: InterviewExperience) -> Result<InterviewExperience, StoreError> {
        let mut records = self.records.write();
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(StoreError::RowMissing(record.id))?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete(&self, record: &InterviewExperience) -> Result<(), StoreError> {
        self.records.write().retain(|r| r.id != record.id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
