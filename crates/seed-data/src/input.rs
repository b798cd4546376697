//! Interactive teacher entry.
//!
//! [`Prompter`] only gathers raw answers; [`TeacherInput::into_profile`]
//! parses and validates them, so the loader never sees unchecked input.

use std::io::{self, BufRead, Write};

use serde_json::{Map, Value};
use thiserror::Error;
use tutoring::{TeacherProfile, TeachingMode};
use validator::Validate;

use crate::fixtures::validation_message;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field}: {message}")]
    Field { field: &'static str, message: String },
    #[error("Invalid teacher: {0}")]
    Invalid(String),
}

fn field_error(field: &'static str, message: impl Into<String>) -> InputError {
    InputError::Field {
        field,
        message: message.into(),
    }
}

/// Asks questions on a writer and reads answers line by line.
pub struct Prompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Prints the label and returns the trimmed answer.
    ///
    /// End of input yields an empty answer.
    pub fn ask(&mut self, label: &str) -> io::Result<String> {
        write!(self.writer, "{label}: ")?;
        self.writer.flush()?;
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    /// Asks a yes/no question; anything but an explicit yes is no.
    pub fn confirm(&mut self, label: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{label} (y/n)"))?;
        Ok(matches!(
            answer.to_lowercase().as_str(),
            "y" | "yes" | "نعم" | "ن"
        ))
    }
}

/// Raw answers for one teacher, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeacherInput {
    pub name: String,
    pub name_en: String,
    pub email: String,
    pub phone: String,
    pub subjects: String,
    pub grade_levels: String,
    pub bio: String,
    pub hourly_rate: String,
    pub experience_years: String,
    pub languages: String,
    pub city: String,
    pub teaching_mode: String,
    pub availability: String,
}

impl TeacherInput {
    /// Asks for every field in order.
    pub fn prompt<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> io::Result<Self> {
        Ok(Self {
            name: prompter.ask("الاسم (Name)")?,
            name_en: prompter.ask("Name in English (optional)")?,
            email: prompter.ask("البريد الإلكتروني (Email)")?,
            phone: prompter.ask("الهاتف (Phone, optional)")?,
            subjects: prompter.ask("المواد، مفصولة بفواصل (Subjects, comma separated)")?,
            grade_levels: prompter.ask("المراحل الدراسية (Grade levels, comma separated)")?,
            bio: prompter.ask("نبذة (Bio)")?,
            hourly_rate: prompter.ask("السعر بالساعة (Hourly rate)")?,
            experience_years: prompter.ask("سنوات الخبرة (Years of experience)")?,
            languages: prompter.ask("اللغات (Languages, comma separated)")?,
            city: prompter.ask("المدينة (City)")?,
            teaching_mode: prompter.ask("طريقة التدريس (online / in_person / hybrid)")?,
            availability: prompter.ask("الأوقات المتاحة (day=HH:MM-HH:MM; ...)")?,
        })
    }

    /// Parses and validates the answers into a profile.
    ///
    /// New teachers start unverified with no rating.
    pub fn into_profile(self) -> Result<TeacherProfile, InputError> {
        let hourly_rate = self
            .hourly_rate
            .replace('٫', ".")
            .parse::<f64>()
            .map_err(|_| field_error("hourly_rate", "must be a number"))?;
        let experience_years = self
            .experience_years
            .parse::<u32>()
            .map_err(|_| field_error("experience_years", "must be a whole number"))?;
        let teaching_mode = TeachingMode::parse(&self.teaching_mode)
            .ok_or_else(|| field_error("teaching_mode", "must be online, in_person or hybrid"))?;
        let availability = parse_availability(&self.availability)?;

        let profile = TeacherProfile {
            name: self.name,
            name_en: optional(self.name_en),
            email: self.email.to_lowercase(),
            phone: optional(self.phone),
            subjects: split_list(&self.subjects),
            grade_levels: split_list(&self.grade_levels),
            bio: self.bio,
            bio_en: None,
            hourly_rate,
            experience_years,
            rating: 0.0,
            languages: split_list(&self.languages),
            city: self.city,
            teaching_mode,
            availability,
            verified: false,
        };

        profile
            .validate()
            .map_err(|e| InputError::Invalid(validation_message(&e)))?;
        Ok(profile)
    }
}

fn optional(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Splits on ASCII and Arabic commas, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', '،'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses `sunday=16:00-20:00,18:00-19:00; monday=...` into a JSON object.
fn parse_availability(raw: &str) -> Result<Value, InputError> {
    let mut days = Map::new();
    for entry in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (day, ranges) = entry
            .split_once('=')
            .ok_or_else(|| field_error("availability", format!("expected day=ranges, got {entry:?}")))?;
        let ranges: Vec<Value> = split_list(ranges).into_iter().map(Value::String).collect();
        if ranges.is_empty() {
            return Err(field_error("availability", format!("no time ranges for {}", day.trim())));
        }
        days.insert(day.trim().to_lowercase(), Value::Array(ranges));
    }
    Ok(Value::Object(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn answers() -> &'static str {
        "سارة منصور\n\nSara@Example.com\n\nرياضيات، علوم\nابتدائي\nمعلمة رياضيات\n15٫5\n4\nالعربية, English\nجدة\nonline\nsunday=16:00-18:00; monday=10:00-12:00,17:00-19:00\n"
    }

    #[test]
    fn test_prompt_reads_every_field() {
        let mut output = Vec::new();
        let mut prompter = Prompter::new(Cursor::new(answers()), &mut output);
        let input = TeacherInput::prompt(&mut prompter).unwrap();

        assert_eq!(input.name, "سارة منصور");
        assert_eq!(input.name_en, "");
        assert_eq!(input.teaching_mode, "online");

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.starts_with("الاسم (Name): "));
    }

    #[test]
    fn test_into_profile() {
        let mut prompter = Prompter::new(Cursor::new(answers()), io::sink());
        let profile = TeacherInput::prompt(&mut prompter)
            .unwrap()
            .into_profile()
            .unwrap();

        assert_eq!(profile.email, "sara@example.com");
        assert_eq!(profile.name_en, None);
        assert_eq!(profile.subjects, vec!["رياضيات", "علوم"]);
        assert_eq!(profile.languages, vec!["العربية", "English"]);
        assert_eq!(profile.hourly_rate, 15.5);
        assert_eq!(profile.teaching_mode, TeachingMode::Online);
        assert_eq!(
            profile.availability,
            json!({"sunday": ["16:00-18:00"], "monday": ["10:00-12:00", "17:00-19:00"]})
        );
        assert!(!profile.verified);
    }

    #[test]
    fn test_bad_number_is_field_error() {
        let input = TeacherInput {
            hourly_rate: "cheap".to_string(),
            ..TeacherInput::default()
        };
        let err = input.into_profile().unwrap_err();
        assert!(matches!(err, InputError::Field { field: "hourly_rate", .. }));
    }

    #[test]
    fn test_validation_runs_after_parsing() {
        let input = TeacherInput {
            name: "سارة".to_string(),
            email: "not-an-email".to_string(),
            subjects: "رياضيات".to_string(),
            bio: "bio".to_string(),
            hourly_rate: "10".to_string(),
            experience_years: "2".to_string(),
            languages: "العربية".to_string(),
            city: "جدة".to_string(),
            teaching_mode: "hybrid".to_string(),
            ..TeacherInput::default()
        };
        let err = input.into_profile().unwrap_err();
        assert_eq!(err, InputError::Invalid("Invalid email address".to_string()));
    }

    #[test]
    fn test_availability_requires_ranges() {
        assert!(parse_availability("").unwrap().as_object().unwrap().is_empty());
        assert!(parse_availability("sunday").is_err());
        assert!(parse_availability("sunday=").is_err());
    }

    #[test]
    fn test_confirm() {
        let mut prompter = Prompter::new(Cursor::new("نعم\nno\n"), io::sink());
        assert!(prompter.confirm("Save?").unwrap());
        assert!(!prompter.confirm("Save?").unwrap());
    }
}
