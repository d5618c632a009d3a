// In-memory directory backed by a JSON fixture, for offline use and tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::api::{ApiError, ScheduleDirectory, TutorDirectory};
use crate::models::{time_slots_from_json, tutors_from_json, TimeSlot, Tutor};
use crate::schedule_search::SearchCriteria;

// Fixture file layout, using the backend's field names
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    #[serde(rename = "tutores")]
    pub tutors: Vec<Value>,
    #[serde(rename = "horarios")]
    pub time_slots: Vec<Value>,
}

pub struct InMemoryDirectory {
    tutors: Mutex<Vec<Tutor>>,
    time_slots: Mutex<Vec<Option<TimeSlot>>>,
    fail_next_requests: AtomicUsize,
    request_count: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new(tutors: Vec<Tutor>, time_slots: Vec<Option<TimeSlot>>) -> Self {
        Self {
            tutors: Mutex::new(tutors),
            time_slots: Mutex::new(time_slots),
            fail_next_requests: AtomicUsize::new(0),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ApiError> {
        let fixture: Fixture =
            serde_json::from_str(json).map_err(|e| ApiError::FixtureError(e.to_string()))?;
        Ok(Self::new(
            tutors_from_json(fixture.tutors),
            time_slots_from_json(fixture.time_slots),
        ))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ApiError::FixtureError(format!("{}: {}", path.display(), e)))?;
        let directory = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            tutors = directory.tutors.lock().len(),
            time_slots = directory.time_slots.lock().len(),
            "fixture loaded"
        );
        Ok(directory)
    }

    pub fn replace_tutors(&self, tutors: Vec<Tutor>) {
        *self.tutors.lock() = tutors;
    }

    pub fn replace_time_slots(&self, time_slots: Vec<Option<TimeSlot>>) {
        *self.time_slots.lock() = time_slots;
    }

    // The next `count` requests fail with a network error
    pub fn fail_next_requests(&self, count: usize) {
        self.fail_next_requests.store(count, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn begin_request(&self) -> Result<(), ApiError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        let failed = self
            .fail_next_requests
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok();
        if failed {
            return Err(ApiError::NetworkError("Service unavailable".to_string()));
        }
        Ok(())
    }
}

// Criteria applied the way the backend does: substring on subject and tutor
// name, inclusive numeric bounds. Null entries pass through untouched.
fn slot_matches(slot: &TimeSlot, criteria: &SearchCriteria) -> bool {
    if let Some(subject) = &criteria.subject {
        if !slot.subjects.iter().any(|name| contains(name, subject)) {
            return false;
        }
    }
    if let Some(name) = &criteria.tutor_name {
        if !slot
            .tutor_name
            .as_deref()
            .map_or(false, |tutor| contains(tutor, name))
        {
            return false;
        }
    }

    criteria.price_min.map_or(true, |min| slot.hourly_price >= min)
        && criteria.price_max.map_or(true, |max| slot.hourly_price <= max)
        && criteria.rating_min.map_or(true, |min| slot.rating >= min)
        && criteria.rating_max.map_or(true, |max| slot.rating <= max)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl TutorDirectory for InMemoryDirectory {
    async fn list_all_tutors(&self) -> Result<Vec<Tutor>, ApiError> {
        self.begin_request()?;
        Ok(self.tutors.lock().clone())
    }
}

#[async_trait]
impl ScheduleDirectory for InMemoryDirectory {
    async fn filter_time_slots(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Option<TimeSlot>>, ApiError> {
        self.begin_request()?;
        let time_slots = self.time_slots.lock();
        Ok(time_slots
            .iter()
            .filter(|entry| {
                entry
                    .as_ref()
                    .map_or(true, |slot| slot_matches(slot, criteria))
            })
            .cloned()
            .collect())
    }
}
