// Time slot search: criteria building from the filter boxes, and the slot
// list that each search replaces

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::ScheduleDirectory;
use crate::models::TimeSlot;

/// Constraints sent to the schedule directory. Fields left unset are not
/// serialized at all, so the backend only sees what the user asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchCriteria {
    #[serde(rename = "materia", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "precioMin", skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,
    #[serde(rename = "precioMax", skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(rename = "calificacionMin", skip_serializing_if = "Option::is_none")]
    pub rating_min: Option<f64>,
    #[serde(rename = "calificacionMax", skip_serializing_if = "Option::is_none")]
    pub rating_max: Option<f64>,
    #[serde(rename = "nombreTutor", skip_serializing_if = "Option::is_none")]
    pub tutor_name: Option<String>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        *self == SearchCriteria::default()
    }
}

// Raw text of the price and rating boxes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBounds {
    pub price_min: String,
    pub price_max: String,
    pub rating_min: String,
    pub rating_max: String,
}

/// Builds criteria from the current box contents. Empty text is omitted;
/// bounds that do not parse as numbers are omitted with a warning.
pub fn build_criteria(subject: &str, tutor_name: &str, bounds: &SearchBounds) -> SearchCriteria {
    SearchCriteria {
        subject: text_field(subject),
        price_min: number_field("price_min", &bounds.price_min),
        price_max: number_field("price_max", &bounds.price_max),
        rating_min: number_field("rating_min", &bounds.rating_min),
        rating_max: number_field("rating_max", &bounds.rating_max),
        tutor_name: text_field(tutor_name),
    }
}

fn text_field(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn number_field(field: &str, value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(number) if number.is_finite() => Some(number),
        _ => {
            warn!(field, value, "ignoring search bound that is not a number");
            None
        }
    }
}

/// Loading indicator shared with observers. Clones see the same flag, so a
/// view can read it while a request is still in flight.
#[derive(Debug, Clone, Default)]
pub struct LoadingFlag(Arc<AtomicBool>);

impl LoadingFlag {
    pub fn new(loading: bool) -> Self {
        Self(Arc::new(AtomicBool::new(loading)))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self, loading: bool) {
        self.0.store(loading, Ordering::SeqCst);
    }

    // Raises the flag until the returned guard drops, including when the
    // request future is cancelled
    pub(crate) fn raise(&self) -> LoadingGuard {
        self.set(true);
        LoadingGuard(self.clone())
    }
}

pub(crate) struct LoadingGuard(LoadingFlag);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// The displayed slot list and the loading flag around its refresh.
#[derive(Debug, Default)]
pub struct ScheduleSearch {
    slots: Vec<TimeSlot>,
    loading: LoadingFlag,
}

impl ScheduleSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_set()
    }

    pub fn loading_flag(&self) -> LoadingFlag {
        self.loading.clone()
    }

    /// Runs one search. On success the slot list is replaced with the
    /// non-null results and their count is returned. On failure the error is
    /// logged, the previous list stays and `None` is returned.
    pub async fn search(
        &mut self,
        directory: &dyn ScheduleDirectory,
        criteria: &SearchCriteria,
    ) -> Option<usize> {
        let guard = self.loading.raise();
        let outcome = directory.filter_time_slots(criteria).await;
        drop(guard);

        match outcome {
            Ok(entries) => {
                let returned = entries.len();
                self.slots = entries.into_iter().flatten().collect();
                info!(
                    returned,
                    kept = self.slots.len(),
                    "time slot search finished"
                );
                Some(self.slots.len())
            }
            Err(e) => {
                error!(error = %e, "time slot search failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use test_case::test_case;

    // Directory that replays a canned result
    struct CannedSchedule {
        result: fn() -> Result<Vec<Option<TimeSlot>>, ApiError>,
    }

    #[async_trait]
    impl ScheduleDirectory for CannedSchedule {
        async fn filter_time_slots(
            &self,
            _criteria: &SearchCriteria,
        ) -> Result<Vec<Option<TimeSlot>>, ApiError> {
            (self.result)()
        }
    }

    // Directory that records whether the search flag was up while it answered
    struct ObservingSchedule {
        flag: LoadingFlag,
        seen_loading: AtomicBool,
    }

    #[async_trait]
    impl ScheduleDirectory for ObservingSchedule {
        async fn filter_time_slots(
            &self,
            _criteria: &SearchCriteria,
        ) -> Result<Vec<Option<TimeSlot>>, ApiError> {
            self.seen_loading.store(self.flag.is_set(), Ordering::SeqCst);
            Ok(vec![Some(slot("1"))])
        }
    }

    // Directory whose answer never arrives
    struct StalledSchedule;

    #[async_trait]
    impl ScheduleDirectory for StalledSchedule {
        async fn filter_time_slots(
            &self,
            _criteria: &SearchCriteria,
        ) -> Result<Vec<Option<TimeSlot>>, ApiError> {
            std::future::pending().await
        }
    }

    fn slot(id: &str) -> TimeSlot {
        TimeSlot {
            id: id.to_string(),
            profile_id: None,
            tutor_name: Some(format!("Tutor {}", id)),
            hourly_price: 20.0,
            rating: 4.0,
            starts_at: None,
            ends_at: None,
            subjects: vec![],
        }
    }

    #[test]
    fn test_empty_boxes_omit_every_field() {
        let criteria = build_criteria("", "", &SearchBounds::default());
        assert!(criteria.is_empty());
        assert_eq!(serde_json::to_value(&criteria).unwrap(), json!({}));
    }

    #[test]
    fn test_filled_boxes_use_wire_names() {
        let bounds = SearchBounds {
            price_min: "20".to_string(),
            price_max: " 50 ".to_string(),
            rating_min: "4".to_string(),
            rating_max: "4.5".to_string(),
        };
        let criteria = build_criteria("Física", "Ana", &bounds);

        assert_eq!(
            serde_json::to_value(&criteria).unwrap(),
            json!({
                "materia": "Física",
                "precioMin": 20.0,
                "precioMax": 50.0,
                "calificacionMin": 4.0,
                "calificacionMax": 4.5,
                "nombreTutor": "Ana"
            })
        );
    }

    #[test_case("", None; "empty")]
    #[test_case("   ", None; "whitespace")]
    #[test_case("abc", None; "not a number")]
    #[test_case("NaN", None; "nan")]
    #[test_case("inf", None; "infinite")]
    #[test_case("0", Some(0.0); "zero is kept")]
    #[test_case("12.5", Some(12.5); "decimal")]
    fn test_price_min_parsing(text: &str, expected: Option<f64>) {
        let bounds = SearchBounds {
            price_min: text.to_string(),
            ..Default::default()
        };
        assert_eq!(build_criteria("", "", &bounds).price_min, expected);
    }

    #[test]
    fn test_only_set_fields_are_serialized() {
        let bounds = SearchBounds {
            rating_min: "3".to_string(),
            ..Default::default()
        };
        let criteria = build_criteria("", "Ruiz", &bounds);
        assert_eq!(
            serde_json::to_value(&criteria).unwrap(),
            json!({"calificacionMin": 3.0, "nombreTutor": "Ruiz"})
        );
    }

    #[tokio::test]
    async fn test_null_entries_are_dropped() {
        let directory = CannedSchedule {
            result: || Ok(vec![Some(slot("1")), None, Some(slot("2")), None]),
        };
        let mut search = ScheduleSearch::new();

        let kept = search.search(&directory, &SearchCriteria::default()).await;

        assert_eq!(kept, Some(2));
        let ids: Vec<&str> = search.slots().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(!search.is_loading());
    }

    #[tokio::test]
    async fn test_loading_is_visible_during_the_request() {
        let mut search = ScheduleSearch::new();
        let directory = ObservingSchedule {
            flag: search.loading_flag(),
            seen_loading: AtomicBool::new(false),
        };
        assert!(!search.is_loading());

        assert_eq!(
            search.search(&directory, &SearchCriteria::default()).await,
            Some(1)
        );

        assert!(directory.seen_loading.load(Ordering::SeqCst));
        assert!(!search.is_loading());
    }

    #[tokio::test]
    async fn test_cancelled_search_lowers_the_flag() {
        let mut search = ScheduleSearch::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            search.search(&StalledSchedule, &SearchCriteria::default()),
        )
        .await;

        assert!(outcome.is_err());
        assert!(!search.is_loading());
        assert!(search.slots().is_empty());
    }

    #[tokio::test]
    async fn test_each_search_replaces_the_list() {
        let first = CannedSchedule {
            result: || Ok(vec![Some(slot("1")), Some(slot("2"))]),
        };
        let second = CannedSchedule {
            result: || Ok(vec![Some(slot("3"))]),
        };
        let mut search = ScheduleSearch::new();

        search.search(&first, &SearchCriteria::default()).await;
        search.search(&second, &SearchCriteria::default()).await;

        assert_eq!(search.slots().len(), 1);
        assert_eq!(search.slots()[0].id, "3");
    }

    #[tokio::test]
    async fn test_failed_search_keeps_previous_slots() {
        let working = CannedSchedule {
            result: || Ok(vec![Some(slot("1"))]),
        };
        let failing = CannedSchedule {
            result: || Err(ApiError::NetworkError("connection refused".to_string())),
        };
        let mut search = ScheduleSearch::new();
        search.search(&working, &SearchCriteria::default()).await;

        let outcome = search.search(&failing, &SearchCriteria::default()).await;

        assert_eq!(outcome, None);
        assert_eq!(search.slots().len(), 1);
        assert_eq!(search.slots()[0].id, "1");
        assert!(!search.is_loading());
    }
}
