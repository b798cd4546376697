//! Study group seeding.
//!
//! Group fixtures name their teacher by email. Before loading, the teachers
//! are looked up and each group gets the store-assigned `teacher_id`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::info;
use tutoring::{Filter, Record, Store, StudyGroup, TeacherProfile};

use crate::loader::{LoadError, SeedBatch};

/// Builds the `groups` batch with teacher identities resolved from the store.
pub async fn group_batch(store: &dyn Store, groups: &[StudyGroup]) -> Result<SeedBatch, LoadError> {
    let mut emails: Vec<Value> = Vec::new();
    for group in groups {
        let email = Value::String(group.teacher_email.clone());
        if !emails.contains(&email) {
            emails.push(email);
        }
    }

    let teacher_ids = if emails.is_empty() {
        HashMap::new()
    } else {
        info!("Resolving {} teachers for {} groups...", emails.len(), groups.len());
        let limit = emails.len();
        let teachers = store
            .select(
                TeacherProfile::TABLE,
                &Filter::any_of(TeacherProfile::EXISTENCE_KEY, emails),
                limit,
            )
            .await
            .map_err(|e| LoadError::from_store(e, LoadError::ExistenceCheckFailed))?;
        index_by_email(&teachers)
    };

    let mut batch = SeedBatch::from_items(StudyGroup::TABLE, StudyGroup::EXISTENCE_KEY, groups)?;
    for (group, record) in groups.iter().zip(batch.records.iter_mut()) {
        let id = teacher_ids
            .get(&group.teacher_email)
            .ok_or_else(|| LoadError::UnknownTeacher(group.teacher_email.clone()))?;
        record.insert(StudyGroup::TEACHER_REF, id.clone());
    }

    Ok(batch)
}

fn index_by_email(teachers: &[Record]) -> HashMap<String, Value> {
    teachers
        .iter()
        .filter_map(|t| {
            let email = t.get(TeacherProfile::EXISTENCE_KEY)?.as_str()?;
            Some((email.to_string(), t.id()?.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::loader::{LoadOutcome, LoadStrategy, load};
    use tutoring::MemoryStore;

    #[tokio::test]
    async fn test_groups_get_teacher_ids() {
        let store = MemoryStore::new();
        let teachers = fixtures::teachers().unwrap();
        let teacher_batch = fixtures::teacher_batch(&teachers).unwrap();
        load(&store, &teacher_batch, LoadStrategy::DirectInsert)
            .await
            .unwrap();

        let groups = fixtures::groups().unwrap();
        let batch = group_batch(&store, &groups).await.unwrap();

        let stored_teachers = store.rows("teachers").await;
        for record in &batch.records {
            let email = record.get("teacher_email").unwrap();
            let teacher = stored_teachers
                .iter()
                .find(|t| t.get("email") == Some(email))
                .unwrap();
            assert_eq!(record.get("teacher_id"), teacher.id());
        }

        let outcome = load(&store, &batch, LoadStrategy::DirectInsert).await.unwrap();
        assert_eq!(outcome.inserted(), groups.len());
        assert!(matches!(outcome, LoadOutcome::Inserted { .. }));
    }

    #[tokio::test]
    async fn test_unknown_teacher_stops_before_insert() {
        let store = MemoryStore::new();
        let groups = fixtures::groups().unwrap();

        let err = group_batch(&store, &groups).await.unwrap_err();
        assert!(matches!(err, LoadError::UnknownTeacher(_)));
        assert_eq!(store.calls().await.inserts, 0);
    }
}
