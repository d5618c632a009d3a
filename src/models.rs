// Tutor and time slot records as the directories send them, and the
// normalized records the rest of the crate works with.
//
// Wire records tolerate missing, null or oddly typed fields. All defaulting
// happens once, in the `From` conversions below.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

// Placeholder shown when a tutor has no usable name
pub const DEFAULT_TUTOR_NAME: &str = "Tutor";

// Raw tutor record
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TutorRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "idTutor", deserialize_with = "lenient_id")]
    pub profile_id: Option<String>,
    #[serde(rename = "nombre", deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido", deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(rename = "usuario", deserialize_with = "lenient_profile")]
    pub profile: Option<ProfileRecord>,
    #[serde(rename = "fotoPerfil", deserialize_with = "lenient_string")]
    pub photo_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub bio: Option<String>,
    // Both spellings show up in production data
    #[serde(rename = "califiacionPromedio", deserialize_with = "lenient_number")]
    pub rating_misspelled: Option<f64>,
    #[serde(rename = "calificacionPromedio", deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    #[serde(rename = "precioHora", deserialize_with = "lenient_number")]
    pub hourly_price: Option<f64>,
    #[serde(rename = "materias")]
    pub subjects: Option<Value>,
}

// User profile nested under a tutor
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    #[serde(rename = "nombre", deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(rename = "apellido", deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(rename = "fotoPerfil", deserialize_with = "lenient_string")]
    pub photo_url: Option<String>,
}

// Raw time slot record
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimeSlotRecord {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "idTutor", deserialize_with = "lenient_id")]
    pub profile_id: Option<String>,
    #[serde(rename = "tutorNombreApellido", deserialize_with = "lenient_string")]
    pub tutor_name: Option<String>,
    #[serde(rename = "precioHora", deserialize_with = "lenient_number")]
    pub hourly_price: Option<f64>,
    #[serde(rename = "califiacionPromedio", deserialize_with = "lenient_number")]
    pub rating_misspelled: Option<f64>,
    #[serde(rename = "calificacionPromedio", deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    #[serde(rename = "fechaInicio", deserialize_with = "lenient_string")]
    pub starts_at: Option<String>,
    #[serde(rename = "fechaFin", deserialize_with = "lenient_string")]
    pub ends_at: Option<String>,
    #[serde(rename = "materias")]
    pub subjects: Option<Value>,
}

/// A subject a tutor teaches, as either a bare name or a name with the
/// tutor's years of experience in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Subject {
    Name(String),
    NameWithExperience {
        name: String,
        years_of_experience: Option<f64>,
    },
}

impl Subject {
    /// Resolves a wire entry by its JSON type. Strings are bare names,
    /// objects are structured records, anything else is not a subject.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Subject::Name(name.clone())),
            Value::Object(fields) => Some(Subject::NameWithExperience {
                name: fields
                    .get("nombre")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                years_of_experience: fields.get("experiencia").and_then(number_from_value),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Subject::Name(name) => name,
            Subject::NameWithExperience { name, .. } => name,
        }
    }

    pub fn years_of_experience(&self) -> Option<f64> {
        match self {
            Subject::Name(_) => None,
            Subject::NameWithExperience {
                years_of_experience,
                ..
            } => *years_of_experience,
        }
    }
}

// A subject list that is missing or not a list is treated as empty
pub fn subjects_from_value(value: Option<&Value>) -> Vec<Subject> {
    match value {
        Some(Value::Array(entries)) => entries.iter().filter_map(Subject::from_value).collect(),
        _ => Vec::new(),
    }
}

/// A tutor with every optional field resolved to a usable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tutor {
    pub id: String,
    pub profile_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub bio: String,
    pub rating: f64,
    pub hourly_price: f64,
    pub subjects: Vec<Subject>,
}

impl From<TutorRecord> for Tutor {
    fn from(record: TutorRecord) -> Self {
        let profile = record.profile.unwrap_or_default();
        let profile_first = non_empty(profile.first_name);
        let profile_last = non_empty(profile.last_name);

        let first_name = non_empty(record.first_name)
            .or_else(|| profile_first.clone())
            .unwrap_or_default();
        let last_name = non_empty(record.last_name)
            .or_else(|| profile_last.clone())
            .unwrap_or_default();

        let display_name = match (&profile_first, &profile_last) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => {
                let full = format!("{} {}", first_name, last_name);
                let full = full.trim();
                if full.is_empty() {
                    DEFAULT_TUTOR_NAME.to_string()
                } else {
                    full.to_string()
                }
            }
        };

        let subjects = subjects_from_value(record.subjects.as_ref());

        Tutor {
            id: record
                .id
                .or_else(|| record.profile_id.clone())
                .unwrap_or_default(),
            profile_id: record.profile_id,
            first_name,
            last_name,
            display_name,
            photo_url: non_empty(profile.photo_url).or_else(|| non_empty(record.photo_url)),
            bio: record.bio.unwrap_or_default(),
            rating: record.rating_misspelled.or(record.rating).unwrap_or(0.0),
            hourly_price: record.hourly_price.unwrap_or(0.0),
            subjects,
        }
    }
}

/// A bookable slot of a tutor's availability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSlot {
    pub id: String,
    pub profile_id: Option<String>,
    pub tutor_name: Option<String>,
    pub hourly_price: f64,
    pub rating: f64,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub subjects: Vec<String>,
}

impl From<TimeSlotRecord> for TimeSlot {
    fn from(record: TimeSlotRecord) -> Self {
        TimeSlot {
            id: record.id.unwrap_or_default(),
            profile_id: record.profile_id,
            tutor_name: non_empty(record.tutor_name),
            hourly_price: record.hourly_price.unwrap_or(0.0),
            rating: record.rating_misspelled.or(record.rating).unwrap_or(0.0),
            starts_at: non_empty(record.starts_at),
            ends_at: non_empty(record.ends_at),
            subjects: subjects_from_value(record.subjects.as_ref())
                .into_iter()
                .map(|subject| subject.name().to_string())
                .collect(),
        }
    }
}

/// Normalizes a tutor list. Entries that are not JSON objects, or that fail
/// to decode, are skipped.
pub fn tutors_from_json(entries: Vec<Value>) -> Vec<Tutor> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            if !entry.is_object() {
                warn!(index, "skipping tutor entry that is not an object");
                return None;
            }
            match serde_json::from_value::<TutorRecord>(entry) {
                Ok(record) => Some(Tutor::from(record)),
                Err(e) => {
                    warn!(index, error = %e, "skipping undecodable tutor entry");
                    None
                }
            }
        })
        .collect()
}

/// Normalizes a time slot list, keeping its shape: null or undecodable
/// entries come back as `None` in their original position.
pub fn time_slots_from_json(entries: Vec<Value>) -> Vec<Option<TimeSlot>> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            Value::Null => None,
            Value::Object(_) => match serde_json::from_value::<TimeSlotRecord>(entry) {
                Ok(record) => Some(TimeSlot::from(record)),
                Err(e) => {
                    warn!(index, error = %e, "undecodable time slot entry");
                    None
                }
            },
            _ => {
                warn!(index, "time slot entry is not an object");
                None
            }
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from_value(&Value::deserialize(deserializer)?))
}

// Text fields take strings as they are and numbers in their decimal form;
// booleans, lists and objects are dropped
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

// Identifiers arrive as numbers from some endpoints and strings from others
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_string(deserializer)
}

// A profile that is not an object is treated as missing
fn lenient_profile<'de, D>(deserializer: D) -> Result<Option<ProfileRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        profile @ Value::Object(_) => serde_json::from_value(profile).ok(),
        _ => None,
    })
}
