use crate::config::DatabaseConfig;
use crate::pager::PageRequest;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Persisted interview experience post
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct InterviewExperience {
    /// Unique post ID, assigned on insert
    pub id: Uuid,
    /// Author display name
    pub user_name: String,
    /// Author e-mail (owner identifier)
    pub user_email: String,
    /// Post title
    pub title: String,
    /// Post body
    pub content: String,
    /// Company the interview was with
    pub company_tag: String,
    /// URL of the attached image, if any
    pub image_url: Option<String>,
    /// When the post was created
    pub created_at: DateTime<Utc>,
    /// When the post was last modified
    pub updated_at: DateTime<Utc>,
}

impl InterviewExperience {
    /// Image URL if one is actually attached (empty strings count as none)
    pub fn attached_image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// A post that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInterviewExperience {
    pub user_name: String,
    pub user_email: String,
    pub title: String,
    pub content: String,
    pub company_tag: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewInterviewExperience {
    /// Attach the store-assigned ID
    pub fn with_id(self, id: Uuid) -> InterviewExperience {
        InterviewExperience {
            id,
            user_name: self.user_name,
            user_email: self.user_email,
            title: self.title,
            content: self.content,
            company_tag: self.company_tag,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Errors raised by record store backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown sort field: {0}")]
    InvalidSortField(String),

    #[error("Interview experience {0} no longer exists")]
    RowMissing(Uuid),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Sortable record field. Accepts the wire (camelCase) and column spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    UserName,
    UserEmail,
    Title,
    Content,
    CompanyTag,
    ImageUrl,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Resolve a requested sort field, rejecting anything that is not a column
    pub fn resolve(field: &str) -> Result<Self, StoreError> {
        let resolved = match field {
            "id" => SortField::Id,
            "userName" | "user_name" => SortField::UserName,
            "userEmail" | "user_email" => SortField::UserEmail,
            "title" => SortField::Title,
            "content" => SortField::Content,
            "companyTag" | "company_tag" => SortField::CompanyTag,
            "imageUrl" | "image_url" => SortField::ImageUrl,
            "createdAt" | "created_at" => SortField::CreatedAt,
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            other => return Err(StoreError::InvalidSortField(other.to_string())),
        };
        Ok(resolved)
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::UserName => "user_name",
            SortField::UserEmail => "user_email",
            SortField::Title => "title",
            SortField::Content => "content",
            SortField::CompanyTag => "company_tag",
            SortField::ImageUrl => "image_url",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

/// Keyed table of interview experience posts.
///
/// Secondary-index scans return the most recently created posts first. Ties
/// keep the backend's native order, which is stable within one call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new post and return it with its assigned ID
    async fn insert(&self, record: NewInterviewExperience) -> Result<InterviewExperience, StoreError>;

    /// Point lookup by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<InterviewExperience>, StoreError>;

    /// All posts by an owner, newest first
    async fn find_by_owner(&self, user_email: &str) -> Result<Vec<InterviewExperience>, StoreError>;

    /// All posts for a company tag, newest first
    async fn find_by_tag(&self, company_tag: &str) -> Result<Vec<InterviewExperience>, StoreError>;

    /// One sorted page plus the total number of posts
    async fn find_page(
        &self,
        request: &PageRequest,
    ) -> Result<(Vec<InterviewExperience>, u64), StoreError>;

    /// Overwrite an existing post, identified by its ID
    async fn save(&self, record: InterviewExperience) -> Result<InterviewExperience, StoreError>;

    /// Remove a post
    async fn delete(&self, record: &InterviewExperience) -> Result<(), StoreError>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> Result<(), StoreError>;
}

const RETURNED_COLUMNS: &str = "id, user_name, user_email, title, content, \
                                company_tag, image_url, created_at, updated_at";

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_name, user_email, title, content,
           company_tag, image_url, created_at, updated_at
    FROM interview_experiences
"#;

/// PostgreSQL-backed record store
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Create a new record store with connection pool
    pub async fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .connect(&config.url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self, record), fields(user_email = %record.user_email))]
    async fn insert(&self, record: NewInterviewExperience) -> Result<InterviewExperience, StoreError> {
        let id = Uuid::new_v4();

        // Read the row back so callers see timestamps at the column's precision.
        let stored = sqlx::query_as::<_, InterviewExperience>(&format!(
            r#"
            INSERT INTO interview_experiences (
                id, user_name, user_email, title, content,
                company_tag, image_url, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9
            )
            RETURNING {RETURNED_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&record.user_name)
        .bind(&record.user_email)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.company_tag)
        .bind(&record.image_url)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert interview experience")?;

        debug!(id = %id, "Interview experience inserted");

        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<InterviewExperience>, StoreError> {
        let record = sqlx::query_as::<_, InterviewExperience>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to query interview experience")?;

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn find_by_owner(&self, user_email: &str) -> Result<Vec<InterviewExperience>, StoreError> {
        let records = sqlx::query_as::<_, InterviewExperience>(&format!(
            "{SELECT_COLUMNS} WHERE user_email = $1 ORDER BY created_at DESC, id ASC"
        ))
        .bind(user_email)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query interview experiences by owner")?;

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn find_by_tag(&self, company_tag: &str) -> Result<Vec<InterviewExperience>, StoreError> {
        let records = sqlx::query_as::<_, InterviewExperience>(&format!(
            "{SELECT_COLUMNS} WHERE company_tag = $1 ORDER BY created_at DESC, id ASC"
        ))
        .bind(company_tag)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query interview experiences by company")?;

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn find_page(
        &self,
        request: &PageRequest,
    ) -> Result<(Vec<InterviewExperience>, u64), StoreError> {
        let sort = SortField::resolve(request.sort_field())?;

        // Column and direction come from closed enums, never from raw input.
        let sql = format!(
            "{SELECT_COLUMNS} ORDER BY {column} {direction}, id ASC LIMIT $1 OFFSET $2",
            column = sort.column(),
            direction = request.direction().as_sql(),
        );

        let offset = i64::try_from(request.offset()).context("Page offset out of range")?;

        // Slice and count must come from one snapshot or the page metadata
        // can disagree with the returned rows.
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .context("Failed to set page snapshot isolation")?;

        let records = sqlx::query_as::<_, InterviewExperience>(&sql)
            .bind(i64::from(request.page_size()))
            .bind(offset)
            .fetch_all(&mut *tx)
            .await
            .context("Failed to query interview experience page")?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM interview_experiences")
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count interview experiences")?;

        tx.commit().await.context("Failed to commit page snapshot")?;

        Ok((records, total.0.max(0) as u64))
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn save(&self, record: InterviewExperience) -> Result<InterviewExperience, StoreError> {
        let saved = sqlx::query_as::<_, InterviewExperience>(&format!(
            r#"
            UPDATE interview_experiences
            SET user_name = $2, user_email = $3, title = $4, content = $5,
                company_tag = $6, image_url = $7, updated_at = $8
            WHERE id = $1
            RETURNING {RETURNED_COLUMNS}
            "#
        ))
        .bind(record.id)
        .bind(&record.user_name)
        .bind(&record.user_email)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.company_tag)
        .bind(&record.image_url)
        .bind(record.updated_at)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update interview experience")?;

        saved.ok_or(StoreError::RowMissing(record.id))
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn delete(&self, record: &InterviewExperience) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM interview_experiences WHERE id = $1")
            .bind(record.id)
            .execute(&self.pool)
            .await
            .context("Failed to delete interview experience")?;

        debug!(id = %record.id, "Interview experience deleted");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }
}
