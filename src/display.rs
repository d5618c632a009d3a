// Display helpers: timestamp shifting and plain-text cards for tutors and
// time slots

use std::fmt::{Display, Write};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

use crate::models::{Subject, TimeSlot, Tutor};
use crate::tutor_filter::TutorFilter;

// Hours subtracted from slot timestamps before display
pub const DEFAULT_HOURS_OFFSET: i64 = 5;

// D/M/YYYY, H:MM:SS
const LOCALE_FORMAT: &str = "%-d/%-m/%Y, %-H:%M:%S";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const BIO_EXCERPT_CHARS: usize = 120;
const MAX_SUBJECT_BADGES: usize = 3;

pub const NO_DATE: &str = "No date";
pub const UNNAMED_TUTOR: &str = "Unnamed tutor";
pub const NO_SUBJECTS: &str = "Not registered";
pub const NO_MATCHES: &str = "No tutors match your search";

/// Parses an ISO timestamp and moves it `hours` earlier, in the given zone.
///
/// Accepts RFC 3339, integer milliseconds since the Unix epoch, a naive
/// date-time (read as local to `tz`), or a bare date (read as UTC midnight).
/// Anything else yields `None`.
pub fn shift_timestamp_in<Tz: TimeZone>(
    iso: Option<&str>,
    hours: i64,
    tz: &Tz,
) -> Option<DateTime<Tz>> {
    let iso = iso?.trim();
    if iso.is_empty() {
        return None;
    }

    let parsed = if let Ok(timestamp) = DateTime::parse_from_rfc3339(iso) {
        timestamp.with_timezone(tz)
    } else if let Ok(millis) = iso.parse::<i64>() {
        DateTime::from_timestamp_millis(millis)?.with_timezone(tz)
    } else if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(iso, format).ok())
    {
        tz.from_local_datetime(&naive).earliest()?
    } else {
        let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
        Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?)
            .with_timezone(tz)
    };

    parsed.checked_sub_signed(TimeDelta::try_hours(hours)?)
}

pub fn format_minus_hours_in<Tz>(iso: Option<&str>, hours: i64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    shift_timestamp_in(iso, hours, tz).map(|timestamp| timestamp.format(LOCALE_FORMAT).to_string())
}

/// Formats an ISO timestamp `hours` earlier in the local time zone, or
/// `None` when the input is missing or unparsable.
pub fn format_minus_hours(iso: Option<&str>, hours: i64) -> Option<String> {
    format_minus_hours_in(iso, hours, &Local)
}

pub fn rating_stars(rating: f64) -> String {
    let count = if rating.is_finite() && rating > 0.0 {
        rating.round() as usize
    } else {
        0
    };
    "⭐".repeat(count)
}

pub fn rating_label(rating: f64) -> String {
    format!("{:.1}", rating)
}

pub fn bio_excerpt(bio: &str) -> String {
    let excerpt: String = bio.chars().take(BIO_EXCERPT_CHARS).collect();
    format!("{}...", excerpt)
}

// First few subjects, then a "+N" badge for the rest
pub fn subject_badges(subjects: &[Subject]) -> Vec<String> {
    let mut badges: Vec<String> = subjects
        .iter()
        .take(MAX_SUBJECT_BADGES)
        .map(|subject| match subject.years_of_experience() {
            Some(years) if years > 0.0 => format!("{} ({}y)", subject.name(), years),
            _ => subject.name().to_string(),
        })
        .collect();

    if subjects.len() > MAX_SUBJECT_BADGES {
        badges.push(format!("+{}", subjects.len() - MAX_SUBJECT_BADGES));
    }
    badges
}

pub fn tutor_card(tutor: &Tutor) -> String {
    let mut card = String::new();
    let _ = writeln!(card, "{}", tutor.display_name);
    let _ = writeln!(
        card,
        "  {} ({})",
        rating_stars(tutor.rating),
        rating_label(tutor.rating)
    );
    let _ = writeln!(card, "  {}", bio_excerpt(&tutor.bio));
    let badges = subject_badges(&tutor.subjects);
    if !badges.is_empty() {
        let _ = writeln!(card, "  Subjects: {}", badges.join(" | "));
    }
    let _ = writeln!(card, "  ${}/hour", tutor.hourly_price);
    if let Some(profile_id) = &tutor.profile_id {
        let _ = writeln!(card, "  Profile: /tutor/{}", profile_id);
    }
    card
}

pub fn time_slot_card_in<Tz>(slot: &TimeSlot, hours_offset: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let when = |iso: &Option<String>| {
        format_minus_hours_in(iso.as_deref(), hours_offset, tz)
            .unwrap_or_else(|| NO_DATE.to_string())
    };
    let subjects = if slot.subjects.is_empty() {
        NO_SUBJECTS.to_string()
    } else {
        slot.subjects.join(", ")
    };

    let mut card = String::new();
    let _ = writeln!(
        card,
        "{}",
        slot.tutor_name.as_deref().unwrap_or(UNNAMED_TUTOR)
    );
    let _ = writeln!(card, "  Price: ${}/hour", slot.hourly_price);
    let _ = writeln!(card, "  Rating: {}", rating_label(slot.rating));
    let _ = writeln!(card, "  {} -> {}", when(&slot.starts_at), when(&slot.ends_at));
    let _ = writeln!(card, "  Subjects: {}", subjects);
    if let Some(profile_id) = &slot.profile_id {
        let _ = writeln!(card, "  Tutor: /tutor/{}", profile_id);
    }
    card
}

pub fn time_slot_card(slot: &TimeSlot, hours_offset: i64) -> String {
    time_slot_card_in(slot, hours_offset, &Local)
}

// Summary line followed by the filtered tutor cards
pub fn tutor_list(filter: &TutorFilter) -> String {
    let mut out = format!("{}\n\n", filter.summary());
    if filter.filtered().is_empty() {
        out.push_str(NO_MATCHES);
        out.push('\n');
        return out;
    }
    for tutor in filter.filtered() {
        out.push_str(&tutor_card(tutor));
        out.push('\n');
    }
    out
}
