//! Seed fixtures shipped with the crate.
//!
//! Each entity has one JSON file under `fixtures/`; the loader is invoked
//! once per fixture instead of carrying literal rows in every script.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tutoring::{StudyGroup, TeacherProfile};
use validator::Validate;

use crate::loader::{LoadError, SeedBatch};

const TEACHERS_JSON: &str = include_str!("../fixtures/teachers.json");
const GROUPS_JSON: &str = include_str!("../fixtures/groups.json");

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Fixture {name} is not valid JSON: {source}")]
    Parse {
        name: &'static str,
        source: serde_json::Error,
    },
    #[error("Fixture {name} entry {index} is invalid: {message}")]
    Invalid {
        name: &'static str,
        index: usize,
        message: String,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Which fixture to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    Teachers,
    Groups,
}

impl Fixture {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "teachers" => Some(Fixture::Teachers),
            "groups" => Some(Fixture::Groups),
            _ => None,
        }
    }
}

/// Collects validator messages into one line.
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

fn parse_validated<T: DeserializeOwned + Validate>(
    name: &'static str,
    json: &str,
) -> Result<Vec<T>, FixtureError> {
    let items: Vec<T> =
        serde_json::from_str(json).map_err(|source| FixtureError::Parse { name, source })?;
    for (index, item) in items.iter().enumerate() {
        item.validate().map_err(|e| FixtureError::Invalid {
            name,
            index,
            message: validation_message(&e),
        })?;
    }
    Ok(items)
}

pub fn teachers() -> Result<Vec<TeacherProfile>, FixtureError> {
    parse_validated("teachers.json", TEACHERS_JSON)
}

pub fn groups() -> Result<Vec<StudyGroup>, FixtureError> {
    parse_validated("groups.json", GROUPS_JSON)
}

/// Batch for the `teachers` table, keyed on email.
pub fn teacher_batch(teachers: &[TeacherProfile]) -> Result<SeedBatch, FixtureError> {
    Ok(SeedBatch::from_items(
        TeacherProfile::TABLE,
        TeacherProfile::EXISTENCE_KEY,
        teachers,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_teacher_fixture_is_valid() {
        let teachers = teachers().unwrap();
        assert_eq!(teachers.len(), 5);

        let emails: HashSet<_> = teachers.iter().map(|t| t.email.as_str()).collect();
        assert_eq!(emails.len(), teachers.len());
    }

    #[test]
    fn test_group_fixture_references_known_teachers() {
        let emails: HashSet<String> = teachers().unwrap().into_iter().map(|t| t.email).collect();
        let groups = groups().unwrap();
        assert!(!groups.is_empty());
        for group in &groups {
            assert!(emails.contains(&group.teacher_email), "{}", group.teacher_email);
        }
    }

    #[test]
    fn test_teacher_batch_has_no_identities() {
        let batch = teacher_batch(&teachers().unwrap()).unwrap();
        assert_eq!(batch.table, "teachers");
        assert_eq!(batch.existence_key, "email");
        assert_eq!(batch.existence_values().unwrap().len(), 5);
    }

    #[test]
    fn test_invalid_fixture_entry_is_reported() {
        let json = r#"[{
            "name": "x", "email": "broken", "subjects": [], "bio": "b",
            "hourly_rate": 1.0, "experience_years": 1, "languages": ["ar"],
            "city": "c", "teaching_mode": "online"
        }]"#;
        let err = parse_validated::<TeacherProfile>("bad.json", json).unwrap_err();
        let FixtureError::Invalid { index, message, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(index, 0);
        assert!(message.contains("Invalid email address"));
        assert!(message.contains("At least one subject is required"));
    }

    #[test]
    fn test_fixture_names() {
        assert_eq!(Fixture::parse("teachers"), Some(Fixture::Teachers));
        assert_eq!(Fixture::parse("groups"), Some(Fixture::Groups));
        assert_eq!(Fixture::parse("students"), None);
    }
}
