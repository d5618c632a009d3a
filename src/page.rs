// Search screen state: the tutor filter and the time slot search share the
// name and subject boxes

use std::sync::Arc;

use crate::api::{ScheduleDirectory, TutorDirectory};
use crate::schedule_search::{build_criteria, ScheduleSearch, SearchBounds, SearchCriteria};
use crate::tutor_filter::TutorFilter;

pub struct SearchPage {
    tutor_directory: Arc<dyn TutorDirectory>,
    schedule_directory: Arc<dyn ScheduleDirectory>,
    tutors: TutorFilter,
    bounds: SearchBounds,
    schedule: ScheduleSearch,
}

impl SearchPage {
    pub fn new(
        tutor_directory: Arc<dyn TutorDirectory>,
        schedule_directory: Arc<dyn ScheduleDirectory>,
    ) -> Self {
        Self {
            tutor_directory,
            schedule_directory,
            tutors: TutorFilter::new(),
            bounds: SearchBounds::default(),
            schedule: ScheduleSearch::new(),
        }
    }

    pub async fn load(&mut self) -> bool {
        let directory = Arc::clone(&self.tutor_directory);
        self.tutors.load(directory.as_ref()).await
    }

    pub fn set_name_query(&mut self, query: impl Into<String>) {
        self.tutors.set_name_query(query);
    }

    pub fn set_subject_query(&mut self, query: impl Into<String>) {
        self.tutors.set_subject_query(query);
    }

    pub fn bounds_mut(&mut self) -> &mut SearchBounds {
        &mut self.bounds
    }

    pub fn criteria(&self) -> SearchCriteria {
        build_criteria(
            self.tutors.subject_query(),
            self.tutors.name_query(),
            &self.bounds,
        )
    }

    pub async fn search_slots(&mut self) -> Option<usize> {
        let criteria = self.criteria();
        let directory = Arc::clone(&self.schedule_directory);
        self.schedule.search(directory.as_ref(), &criteria).await
    }

    pub fn tutors(&self) -> &TutorFilter {
        &self.tutors
    }

    pub fn schedule(&self) -> &ScheduleSearch {
        &self.schedule
    }
}
