pub mod deriver;
pub mod export;
pub mod store;
pub mod summary;

pub use deriver::ProgressSnapshot;
pub use export::save_export;
pub use store::{ProgressStore, StoreOptions, ToggleOutcome};

pub type StepId = u32;
pub type ExtraTopicId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub steps: usize,
    pub extras: usize,
}
