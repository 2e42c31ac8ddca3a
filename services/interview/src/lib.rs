//! Interview Experience Service
//!
//! Stores candidates' write-ups of job interviews, each optionally carrying one
//! image. Post records live in PostgreSQL, images live in S3, and the
//! lifecycle coordinator keeps the two consistent: a stored `image_url` always
//! points at an object that was successfully uploaded.
//!
//! ## Features
//!
//! - **Post Lifecycle**: create, read, search by author or company, sorted
//!   paging, full-overwrite update and delete
//! - **Image Consistency**: upload-before-persist on create, replace-then-delete
//!   on update, best-effort image cleanup on delete
//! - **Paginated Listing**: zero-based pages sorted by any post field, with
//!   total element and page counts
//! - **HTTP API**: multipart submissions, validation, trace-id propagation
//!
//! ## Architecture
//!
//! ```text
//!  HTTP clients
//!       │
//!       ▼
//! ┌──────────────┐     ┌──────────────┐
//! │ API          │────▶│ Mapper /     │
//! │ (axum)       │     │ Validation   │
//! └──────────────┘     └──────────────┘
//!       │
//!       ▼
//! ┌──────────────┐           ┌──────────────┐
//! │ Experience   │──────────▶│ Blob Store   │──▶ S3 bucket
//! │ Coordinator  │           │              │    interview-experience/
//! └──────────────┘           └──────────────┘
//!       │
//!       ▼
//! ┌──────────────┐
//! │ Record Store │──▶ PostgreSQL
//! │              │    interview_experiences
//! └──────────────┘
//! ```

pub mod api;
pub mod blob_store;
pub mod config;
pub mod coordinator;
pub mod mapper;
pub mod memory_store;
pub mod pager;
pub mod record_store;
pub mod validation;

pub use api::{AppState, ErrorResponse};
pub use blob_store::{BlobStore, BlobStoreError, ImageUpload, InMemoryBlobStore, S3BlobStore};
pub use config::Config;
pub use coordinator::{Clock, ExperienceCoordinator, ExperienceError, SystemClock};
pub use mapper::{ExperienceRequest, ExperienceResponse};
pub use memory_store::InMemoryRecordStore;
pub use pager::{Page, PageRequest, PageRequestError, SortDirection};
pub use record_store::{InterviewExperience, PgRecordStore, RecordStore, StoreError};
pub use validation::ValidationError;
