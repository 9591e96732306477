//! The ledger is the in-memory list of every [Activity](entities::Activity) timed in the
//! current session. It is only ever replaced wholesale (import) or mutated in place by the
//! session controller. Nothing removes single entries.

pub mod entities;

use std::collections::HashSet;

use entities::{Activity, ActivityKey};

#[derive(PartialEq, Debug, Clone, Default)]
pub struct Ledger {
    activities: Vec<Activity>,
}

#[derive(Debug, thiserror::Error)]
#[error("activity {key:?} appears more than once (entry {index})")]
pub struct DuplicateActivity {
    pub key: ActivityKey,
    pub index: usize,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from already validated activities, refusing duplicate identities.
    pub fn from_activities(activities: Vec<Activity>) -> Result<Self, DuplicateActivity> {
        let mut seen = HashSet::new();
        for (index, activity) in activities.iter().enumerate() {
            let key = activity.key();
            if !seen.insert(key.clone()) {
                return Err(DuplicateActivity { key, index });
            }
        }
        Ok(Self { activities })
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn get(&self, key: &ActivityKey) -> Option<&Activity> {
        self.activities.iter().find(|v| key.matches(v))
    }

    pub fn get_mut(&mut self, key: &ActivityKey) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|v| key.matches(v))
    }

    /// Appends a new activity. Returns the activity back if its identity is already taken.
    pub fn insert(&mut self, activity: Activity) -> Result<&mut Activity, Activity> {
        let key = activity.key();
        if self.get(&key).is_some() {
            return Err(activity);
        }
        self.activities.push(activity);
        let last = self.activities.len() - 1;
        Ok(&mut self.activities[last])
    }

    pub fn replace(&mut self, other: Ledger) {
        *self = other;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::CUSTOM_ACTIVITY_ID,
        ledger::entities::{Comment, DEFAULT_COMMENT},
    };

    fn activity(id: u32, name: &str) -> Activity {
        Activity::new(
            id,
            name.into(),
            Comment {
                text: DEFAULT_COMMENT.into(),
                timestamp: "15/03/2024, 09:30:00".into(),
            },
            "15/03/2024, 09:30:00".into(),
        )
    }

    #[test]
    fn insert_refuses_taken_identity() {
        let mut ledger = Ledger::new();
        assert!(ledger.insert(activity(1, "Lectura")).is_ok());
        let rejected = ledger.insert(activity(1, "Lectura again")).unwrap_err();
        assert_eq!(rejected.name, "Lectura again");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn custom_activities_coexist() {
        let mut ledger = Ledger::new();
        ledger.insert(activity(CUSTOM_ACTIVITY_ID, "Piano")).unwrap();
        ledger.insert(activity(CUSTOM_ACTIVITY_ID, "Yoga")).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            ledger
                .get(&ActivityKey::Custom("Yoga".into()))
                .map(|v| v.name.as_str()),
            Some("Yoga")
        );
    }

    #[test]
    fn from_activities_detects_duplicates() {
        let result = Ledger::from_activities(vec![
            activity(2, "Escritura"),
            activity(3, "Investigación"),
            activity(2, "Escritura"),
        ]);
        let err = result.unwrap_err();
        assert_eq!(err.index, 2);
        assert_eq!(err.key, ActivityKey::Catalog(2));
    }

    #[test]
    fn replace_swaps_everything() {
        let mut ledger = Ledger::new();
        ledger.insert(activity(1, "Lectura")).unwrap();
        let other = Ledger::from_activities(vec![activity(4, "Reunión"), activity(5, "Programación")])
            .unwrap();
        ledger.replace(other.clone());
        assert_eq!(ledger, other);
        assert!(ledger.get(&ActivityKey::Catalog(1)).is_none());
    }
}
