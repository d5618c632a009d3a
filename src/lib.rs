// Tutor search library: tutor list filtering and time slot search against
// the marketplace's tutor and schedule directories

pub mod api;
pub mod display;
pub mod fixture;
pub mod models;
pub mod page;
pub mod schedule_search;
pub mod tutor_filter;

// Re-export key types for convenience
pub use api::{
    ApiError, ClientConfig, ClientError, HttpDirectoryClient, ScheduleDirectory, TutorDirectory,
};
pub use display::{format_minus_hours, format_minus_hours_in, DEFAULT_HOURS_OFFSET};
pub use fixture::InMemoryDirectory;
pub use models::{Subject, TimeSlot, Tutor};
pub use page::SearchPage;
pub use schedule_search::{
    build_criteria, LoadingFlag, ScheduleSearch, SearchBounds, SearchCriteria,
};
pub use tutor_filter::{filter_tutors, TutorFilter};
