use super::deriver::{ProgressSnapshot, derive};
use super::export::ExportDocument;
use super::{ExtraTopicId, StepId, Totals};
use crate::config::Config;
use crate::curriculum::Curriculum;
use crate::storage::{KeyValueStore, StorageKeys};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Saved,
    Failed,
}

impl Persistence {
    pub fn is_saved(self) -> bool {
        self == Self::Saved
    }

    fn and(self, other: Self) -> Self {
        if self.is_saved() { other } else { self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub completed: bool,
    pub persistence: Persistence,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub keys: StorageKeys,
    pub clear_resets_last_activity: bool,
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keys: StorageKeys::with_prefix(&config.key_prefix),
            clear_resets_last_activity: config.clear_resets_last_activity,
        }
    }
}

// In-memory state is authoritative. Failed writes come back as Persistence::Failed.
pub struct ProgressStore<S: KeyValueStore> {
    storage: S,
    options: StoreOptions,
    totals: Totals,
    clock: fn() -> DateTime<Utc>,
    steps: BTreeSet<StepId>,
    extras: BTreeSet<ExtraTopicId>,
    last_activity: Option<DateTime<Utc>>,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn load(storage: S, totals: Totals, options: StoreOptions) -> Self {
        let steps = read_set(&storage, &options.keys.steps);
        let extras = read_set(&storage, &options.keys.extras);
        let last_activity = read_timestamp(&storage, &options.keys.last_activity);

        Self {
            storage,
            options,
            totals,
            clock: Utc::now,
            steps,
            extras,
            last_activity,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn completed_steps(&self) -> &BTreeSet<StepId> {
        &self.steps
    }

    pub fn completed_extras(&self) -> &BTreeSet<ExtraTopicId> {
        &self.extras
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity
    }

    pub fn is_step_completed(&self, id: StepId) -> bool {
        self.steps.contains(&id)
    }

    pub fn is_extra_completed(&self, id: &str) -> bool {
        self.extras.contains(id)
    }

    pub fn retain_known(&mut self, curriculum: &Curriculum) {
        let unknown_steps: Vec<StepId> = self
            .steps
            .iter()
            .copied()
            .filter(|id| !curriculum.contains_step(*id))
            .collect();
        let unknown_extras: Vec<ExtraTopicId> = self
            .extras
            .iter()
            .filter(|id| !curriculum.contains_extra(id))
            .cloned()
            .collect();

        if unknown_steps.is_empty() && unknown_extras.is_empty() {
            return;
        }

        warn!(
            steps = ?unknown_steps,
            extras = ?unknown_extras,
            curriculum = %curriculum.title,
            "ignoring stored progress the curriculum does not know"
        );
        self.steps.retain(|id| curriculum.contains_step(*id));
        self.extras.retain(|id| curriculum.contains_extra(id));
    }

    pub fn toggle_step(&mut self, id: StepId) -> ToggleOutcome {
        let completed = if self.steps.remove(&id) {
            false
        } else {
            self.steps.insert(id)
        };

        let persistence = write_json(&mut self.storage, &self.options.keys.steps, &self.steps)
            .and(self.touch());

        ToggleOutcome {
            completed,
            persistence,
        }
    }

    pub fn toggle_extra(&mut self, id: &str) -> ToggleOutcome {
        let completed = if self.extras.remove(id) {
            false
        } else {
            self.extras.insert(id.to_string())
        };

        let persistence = write_json(&mut self.storage, &self.options.keys.extras, &self.extras)
            .and(self.touch());

        ToggleOutcome {
            completed,
            persistence,
        }
    }

    pub fn clear(&mut self) -> Persistence {
        self.steps.clear();
        self.extras.clear();

        let mut persistence = remove_key(&mut self.storage, &self.options.keys.steps)
            .and(remove_key(&mut self.storage, &self.options.keys.extras));

        if self.options.clear_resets_last_activity {
            self.last_activity = None;
            persistence =
                persistence.and(remove_key(&mut self.storage, &self.options.keys.last_activity));
        }

        persistence
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument {
            steps: self.steps.iter().copied().collect(),
            extras: self.extras.iter().cloned().collect(),
            export_date: (self.clock)(),
            total_steps: self.totals.steps,
            total_extras: self.totals.extras,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        derive(self.steps.len(), self.extras.len(), self.totals)
    }

    fn touch(&mut self) -> Persistence {
        let now = (self.clock)();
        self.last_activity = Some(now);

        write_raw(
            &mut self.storage,
            &self.options.keys.last_activity,
            &iso_timestamp(&now),
        )
    }
}

pub fn iso_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn read_set<S, T>(storage: &S, key: &str) -> BTreeSet<T>
where
    S: KeyValueStore,
    T: DeserializeOwned + Ord,
{
    let raw = match storage.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return BTreeSet::new(),
        Err(error) => {
            warn!(key, error = %error, "failed to read stored progress. starting empty");
            return BTreeSet::new();
        }
    };

    serde_json::from_str::<Vec<T>>(&raw)
        .map(|items| items.into_iter().collect())
        .unwrap_or_else(|error| {
            warn!(key, error = %error, "stored progress is malformed. starting empty");
            BTreeSet::new()
        })
}

fn read_timestamp<S: KeyValueStore>(storage: &S, key: &str) -> Option<DateTime<Utc>> {
    let raw = storage
        .get(key)
        .map_err(|error| warn!(key, error = %error, "failed to read last activity"))
        .ok()
        .flatten()?;

    DateTime::parse_from_rfc3339(raw.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| warn!(key, error = %error, "ignoring malformed last activity"))
        .ok()
}

fn write_json<S, T>(storage: &mut S, key: &str, value: &T) -> Persistence
where
    S: KeyValueStore,
    T: Serialize,
{
    match serde_json::to_string(value).context("Failed to serialize progress") {
        Ok(json) => write_raw(storage, key, &json),
        Err(error) => {
            warn!(key, error = %error, "progress kept in memory only");
            Persistence::Failed
        }
    }
}

fn write_raw<S: KeyValueStore>(storage: &mut S, key: &str, value: &str) -> Persistence {
    match storage.set(key, value) {
        Ok(()) => Persistence::Saved,
        Err(error) => {
            warn!(key, error = %error, "failed to persist progress. keeping in-memory state");
            Persistence::Failed
        }
    }
}

fn remove_key<S: KeyValueStore>(storage: &mut S, key: &str) -> Persistence {
    match storage.remove(key) {
        Ok(()) => Persistence::Saved,
        Err(error) => {
            warn!(key, error = %error, "failed to remove stored progress");
            Persistence::Failed
        }
    }
}
