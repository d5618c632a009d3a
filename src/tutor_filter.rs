// Tutor list filtering by name and subject text

use tracing::{error, info};

use crate::api::TutorDirectory;
use crate::models::Tutor;
use crate::schedule_search::LoadingFlag;

/// Returns the tutors matching both queries, in their original order.
///
/// Matching is a case-insensitive substring test. The name query matches the
/// first name or the last name; the subject query matches if any subject
/// name contains it. An empty query matches everything.
pub fn filter_tutors(tutors: &[Tutor], name_query: &str, subject_query: &str) -> Vec<Tutor> {
    let name_needle = name_query.to_lowercase();
    let subject_needle = subject_query.to_lowercase();

    tutors
        .iter()
        .filter(|tutor| name_needle.is_empty() || matches_name(tutor, &name_needle))
        .filter(|tutor| subject_needle.is_empty() || matches_subject(tutor, &subject_needle))
        .cloned()
        .collect()
}

fn matches_name(tutor: &Tutor, needle: &str) -> bool {
    tutor.first_name.to_lowercase().contains(needle)
        || tutor.last_name.to_lowercase().contains(needle)
}

fn matches_subject(tutor: &Tutor, needle: &str) -> bool {
    tutor
        .subjects
        .iter()
        .any(|subject| subject.name().to_lowercase().contains(needle))
}

/// The tutor list of the search screen with its filtered view.
///
/// Every mutation re-derives the view from scratch.
#[derive(Debug)]
pub struct TutorFilter {
    tutors: Vec<Tutor>,
    filtered: Vec<Tutor>,
    name_query: String,
    subject_query: String,
    loading: LoadingFlag,
}

impl Default for TutorFilter {
    fn default() -> Self {
        Self {
            tutors: Vec::new(),
            filtered: Vec::new(),
            name_query: String::new(),
            subject_query: String::new(),
            // Nothing to show until the first load settles
            loading: LoadingFlag::new(true),
        }
    }
}

impl TutorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the full tutor list. A failure is logged and leaves the
    /// current list in place. Returns whether the load succeeded.
    pub async fn load(&mut self, directory: &dyn TutorDirectory) -> bool {
        let guard = self.loading.raise();
        let outcome = directory.list_all_tutors().await;
        drop(guard);

        match outcome {
            Ok(tutors) => {
                info!(count = tutors.len(), "tutors loaded");
                self.set_tutors(tutors);
                true
            }
            Err(e) => {
                error!(error = %e, "loading tutors failed");
                false
            }
        }
    }

    pub fn set_tutors(&mut self, tutors: Vec<Tutor>) {
        self.tutors = tutors;
        self.refilter();
    }

    pub fn set_name_query(&mut self, query: impl Into<String>) {
        self.name_query = query.into();
        self.refilter();
    }

    pub fn set_subject_query(&mut self, query: impl Into<String>) {
        self.subject_query = query.into();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = filter_tutors(&self.tutors, &self.name_query, &self.subject_query);
    }

    pub fn tutors(&self) -> &[Tutor] {
        &self.tutors
    }

    pub fn filtered(&self) -> &[Tutor] {
        &self.filtered
    }

    pub fn name_query(&self) -> &str {
        &self.name_query
    }

    pub fn subject_query(&self) -> &str {
        &self.subject_query
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    pub fn summary(&self) -> String {
        format!(
            "Showing {} of {} tutors",
            self.filtered.len(),
            self.tutors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::fixture::InMemoryDirectory;
    use crate::models::tutors_from_json;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use test_case::test_case;

    // Directory that records whether the load flag was up while it answered
    struct ObservingDirectory {
        flag: LoadingFlag,
        seen_loading: AtomicBool,
    }

    #[async_trait]
    impl TutorDirectory for ObservingDirectory {
        async fn list_all_tutors(&self) -> Result<Vec<Tutor>, ApiError> {
            self.seen_loading.store(self.flag.is_set(), Ordering::SeqCst);
            Err(ApiError::NetworkError("connection reset".to_string()))
        }
    }

    fn sample_tutors() -> Vec<Tutor> {
        tutors_from_json(vec![
            json!({
                "id": 1,
                "nombre": "Ana",
                "apellido": "Ruiz",
                "materias": ["Matemáticas", "Física"]
            }),
            json!({
                "id": 2,
                "nombre": "Luis",
                "apellido": "Anaya",
                "materias": [{"nombre": "Química", "experiencia": 4}]
            }),
            json!({
                "id": 3,
                "apellido": "Gómez",
                "materias": "Historia"
            }),
            json!({
                "id": 4,
                "usuario": {"nombre": "Marta", "apellido": "Soto"}
            }),
        ])
    }

    fn ids(tutors: &[Tutor]) -> Vec<&str> {
        tutors.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_empty_queries_return_everything() {
        let tutors = sample_tutors();
        assert_eq!(filter_tutors(&tutors, "", ""), tutors);
    }

    #[test]
    fn test_empty_list_stays_empty() {
        assert!(filter_tutors(&[], "ana", "física").is_empty());
    }

    #[test_case("ana", "", vec!["1", "2"]; "#1 first name or last name")]
    #[test_case("ANA", "", vec!["1", "2"]; "#2 case insensitive name")]
    #[test_case("gómez", "", vec!["3"]; "#3 last name only tutor")]
    #[test_case("marta", "", vec!["4"]; "#4 name from profile record")]
    #[test_case("", "física", vec!["1"]; "#5 bare string subject")]
    #[test_case("", "QUÍM", vec!["2"]; "#6 structured subject")]
    #[test_case("", "historia", vec![]; "#7 malformed subject list never matches")]
    #[test_case("ana", "química", vec!["2"]; "#8 both predicates")]
    #[test_case("zzz", "", vec![]; "#9 no match")]
    fn test_filter_cases(name: &str, subject: &str, expected: Vec<&str>) {
        let tutors = sample_tutors();
        let filtered = filter_tutors(&tutors, name, subject);
        assert_eq!(ids(&filtered), expected);
    }

    #[test]
    fn test_tutor_without_subjects_fails_subject_filter() {
        let tutors = sample_tutors();
        let filtered = filter_tutors(&tutors, "", "a");
        assert!(!ids(&filtered).contains(&"4"));
    }

    #[test]
    fn test_result_is_ordered_subset() {
        let tutors = sample_tutors();
        let filtered = filter_tutors(&tutors, "a", "");
        let mut positions = filtered
            .iter()
            .map(|t| tutors.iter().position(|candidate| candidate == t).unwrap());
        let mut last = positions.next().unwrap();
        for position in positions {
            assert!(position > last);
            last = position;
        }
    }

    #[test]
    fn test_mutations_recompute_the_view() {
        let mut filter = TutorFilter::new();
        filter.set_tutors(sample_tutors());
        assert_eq!(filter.filtered().len(), 4);

        filter.set_name_query("ana");
        assert_eq!(ids(filter.filtered()), vec!["1", "2"]);

        filter.set_subject_query("física");
        assert_eq!(ids(filter.filtered()), vec!["1"]);

        filter.set_name_query("");
        filter.set_subject_query("");
        assert_eq!(filter.filtered().len(), 4);
        assert_eq!(filter.summary(), "Showing 4 of 4 tutors");
    }

    #[test]
    fn test_queries_set_before_load_apply_to_loaded_list() {
        let directory = InMemoryDirectory::new(sample_tutors(), vec![]);
        let mut filter = TutorFilter::new();
        filter.set_subject_query("quím");

        assert!(tokio_test::block_on(filter.load(&directory)));
        assert_eq!(ids(filter.filtered()), vec!["2"]);
        assert_eq!(filter.summary(), "Showing 1 of 4 tutors");
    }

    #[tokio::test]
    async fn test_load_clears_loading_flag() {
        let directory = InMemoryDirectory::new(sample_tutors(), vec![]);
        let mut filter = TutorFilter::new();
        assert!(filter.is_loading());

        assert!(filter.load(&directory).await);
        assert!(!filter.is_loading());
        assert_eq!(filter.tutors().len(), 4);
    }

    #[tokio::test]
    async fn test_reload_shows_loading_during_the_request() {
        let mut filter = TutorFilter::new();
        filter.set_tutors(sample_tutors());
        let directory = InMemoryDirectory::new(vec![], vec![]);
        assert!(filter.load(&directory).await);
        assert!(!filter.is_loading());

        let observing = ObservingDirectory {
            flag: filter.loading_flag(),
            seen_loading: AtomicBool::new(false),
        };
        assert!(!filter.load(&observing).await);

        assert!(observing.seen_loading.load(Ordering::SeqCst));
        assert!(!filter.is_loading());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_list_and_clears_loading() {
        let directory = InMemoryDirectory::new(sample_tutors(), vec![]);
        directory.fail_next_requests(1);
        let mut filter = TutorFilter::new();

        assert!(!filter.load(&directory).await);
        assert!(!filter.is_loading());
        assert!(filter.tutors().is_empty());
        assert_eq!(filter.summary(), "Showing 0 of 0 tutors");
    }
}
