use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// One row as exchanged with the store: field name to JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Field holding the store-assigned identity.
    pub const IDENTITY_FIELD: &'static str = "id";

    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Converts any serializable struct into a record.
    ///
    /// Returns `None` when the value does not serialize to a JSON object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Option<Self>, serde_json::Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Some(Self(map))),
            _ => Ok(None),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Store-assigned identity, if the record has been persisted.
    pub fn id(&self) -> Option<&Value> {
        self.get(Self::IDENTITY_FIELD).filter(|v| !v.is_null())
    }

    pub fn has_identity(&self) -> bool {
        self.id().is_some()
    }

    /// Field names, in map order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// How a teacher delivers lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingMode {
    Online,
    InPerson,
    Hybrid,
}

impl TeachingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeachingMode::Online => "online",
            TeachingMode::InPerson => "in_person",
            TeachingMode::Hybrid => "hybrid",
        }
    }

    /// Parses the database form as well as the Arabic labels shown in the app.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "online" | "أونلاين" | "عن بعد" => Some(TeachingMode::Online),
            "in_person" | "in-person" | "حضوري" => Some(TeachingMode::InPerson),
            "hybrid" | "مدمج" => Some(TeachingMode::Hybrid),
            _ => None,
        }
    }
}

/// Teacher profile as stored in the `teachers` table.
///
/// Arabic fields are primary; `*_en` fields carry the optional English copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TeacherProfile {
    #[validate(length(min = 2, max = 100, message = "Name must be between 2 and 100 characters"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "At least one subject is required"))]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub grade_levels: Vec<String>,
    #[validate(length(min = 1, message = "Bio is required"))]
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio_en: Option<String>,
    #[validate(range(min = 0.0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate: f64,
    #[validate(range(max = 60, message = "Experience must be at most 60 years"))]
    pub experience_years: u32,
    #[validate(range(min = 0.0, max = 5.0, message = "Rating must be between 0 and 5"))]
    #[serde(default)]
    pub rating: f64,
    #[validate(length(min = 1, message = "At least one language is required"))]
    pub languages: Vec<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    pub teaching_mode: TeachingMode,
    #[serde(default)]
    pub availability: serde_json::Value,
    #[serde(default)]
    pub verified: bool,
}

impl TeacherProfile {
    pub const TABLE: &'static str = "teachers";
    pub const EXISTENCE_KEY: &'static str = "email";
}

/// Study group offered by a teacher, stored in the `groups` table.
///
/// Fixtures name the teacher by email; `teacher_id` is filled in from the
/// store before insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StudyGroup {
    #[validate(length(min = 2, max = 150, message = "Title must be between 2 and 150 characters"))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_en: Option<String>,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    pub grade_level: String,
    #[validate(email(message = "Invalid teacher email"))]
    pub teacher_email: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, max = 200, message = "Group size must be between 1 and 200"))]
    pub max_students: u32,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price_per_session: f64,
    #[serde(default)]
    pub schedule: serde_json::Value,
    #[validate(length(equal = 10, message = "Start date must be YYYY-MM-DD"))]
    pub starts_on: String,
}

impl StudyGroup {
    pub const TABLE: &'static str = "groups";
    pub const EXISTENCE_KEY: &'static str = "title";
    /// Column the resolved teacher identity is written to.
    pub const TEACHER_REF: &'static str = "teacher_id";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn teacher() -> TeacherProfile {
        TeacherProfile {
            name: "أحمد الخطيب".to_string(),
            name_en: Some("Ahmad Al-Khatib".to_string()),
            email: "ahmad@example.com".to_string(),
            phone: None,
            subjects: vec!["رياضيات".to_string()],
            grade_levels: vec!["ثانوي".to_string()],
            bio: "مدرس رياضيات".to_string(),
            bio_en: None,
            hourly_rate: 120.0,
            experience_years: 8,
            rating: 4.7,
            languages: vec!["العربية".to_string()],
            city: "عمّان".to_string(),
            teaching_mode: TeachingMode::Hybrid,
            availability: json!({"sunday": ["16:00-20:00"]}),
            verified: true,
        }
    }

    #[test]
    fn test_record_from_profile_has_no_identity() {
        let record = Record::from_serialize(&teacher()).unwrap().unwrap();
        assert!(!record.has_identity());
        assert_eq!(record.get("email"), Some(&json!("ahmad@example.com")));
        assert_eq!(record.get("teaching_mode"), Some(&json!("hybrid")));
        // Absent optionals are not sent, so the store applies its defaults
        assert!(record.get("phone").is_none());
    }

    #[test]
    fn test_record_null_id_is_not_identity() {
        let record = Record::new().with("id", serde_json::Value::Null);
        assert!(!record.has_identity());
        let record = record.with("id", "b2c1");
        assert!(record.has_identity());
    }

    #[test]
    fn test_record_from_scalar_is_none() {
        assert!(Record::from_serialize(&42).unwrap().is_none());
    }

    #[test]
    fn test_teaching_mode_parse() {
        assert_eq!(TeachingMode::parse("Online"), Some(TeachingMode::Online));
        assert_eq!(TeachingMode::parse("حضوري"), Some(TeachingMode::InPerson));
        assert_eq!(TeachingMode::parse(" hybrid "), Some(TeachingMode::Hybrid));
        assert_eq!(TeachingMode::parse("carrier pigeon"), None);
    }

    #[test]
    fn test_teacher_validation() {
        assert!(teacher().validate().is_ok());

        let mut bad = teacher();
        bad.email = "not-an-email".to_string();
        bad.rating = 7.0;
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("rating"));
    }
}
