use super::Totals;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Basic,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl Level {
    pub fn from_progress(overall: f64) -> Self {
        match overall {
            value if value <= 0.0 => Self::Beginner,
            value if value < 25.0 => Self::Basic,
            value if value < 50.0 => Self::Intermediate,
            value if value < 75.0 => Self::Advanced,
            value if value < 100.0 => Self::Expert,
            _ => Self::Master,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
            Self::Expert => "Expert",
            Self::Master => "Master",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Achievement {
    FirstStep,
    Scholar,
    Halfway,
    Explorer,
    Master,
}

impl Achievement {
    pub const ALL: [Achievement; 5] = [
        Self::FirstStep,
        Self::Scholar,
        Self::Halfway,
        Self::Explorer,
        Self::Master,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::FirstStep => "first-step",
            Self::Scholar => "scholar",
            Self::Halfway => "halfway",
            Self::Explorer => "explorer",
            Self::Master => "master",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::FirstStep => "First Step",
            Self::Scholar => "Scholar",
            Self::Halfway => "Halfway There",
            Self::Explorer => "Explorer",
            Self::Master => "Java Master",
        }
    }

    fn unlocked(self, completed_steps: usize, completed_extras: usize, overall: f64) -> bool {
        match self {
            Self::FirstStep => overall >= 10.0,
            Self::Scholar => completed_steps >= 5,
            Self::Halfway => overall >= 50.0,
            Self::Explorer => completed_extras >= 10,
            Self::Master => overall >= 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub completed_steps: usize,
    pub completed_extras: usize,
    pub total_steps: usize,
    pub total_extras: usize,
    pub steps_progress: f64,
    pub extras_progress: f64,
    pub overall_progress: f64,
    pub level: Level,
    pub achievements: BTreeSet<Achievement>,
}

impl ProgressSnapshot {
    pub fn overall_rounded(&self) -> u8 {
        self.overall_progress.round() as u8
    }

    pub fn has(&self, achievement: Achievement) -> bool {
        self.achievements.contains(&achievement)
    }
}

pub fn derive(completed_steps: usize, completed_extras: usize, totals: Totals) -> ProgressSnapshot {
    let steps_progress = percent(completed_steps, totals.steps);
    let extras_progress = percent(completed_extras, totals.extras);
    let overall_progress = percent(
        completed_steps + completed_extras,
        totals.steps + totals.extras,
    );

    let achievements = Achievement::ALL
        .into_iter()
        .filter(|achievement| {
            achievement.unlocked(completed_steps, completed_extras, overall_progress)
        })
        .collect::<BTreeSet<_>>();

    ProgressSnapshot {
        completed_steps,
        completed_extras,
        total_steps: totals.steps,
        total_extras: totals.extras,
        steps_progress,
        extras_progress,
        overall_progress,
        level: Level::from_progress(overall_progress),
        achievements,
    }
}

fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    ((completed as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::{Achievement, Level, derive};
    use crate::progress::Totals;
    use std::collections::BTreeSet;

    const TOTALS: Totals = Totals {
        steps: 10,
        extras: 20,
    };

    #[test]
    fn half_the_steps_and_no_extras() {
        let snapshot = derive(5, 0, TOTALS);

        assert_eq!(snapshot.steps_progress, 50.0);
        assert_eq!(snapshot.extras_progress, 0.0);
        assert!((snapshot.overall_progress - 16.666_666).abs() < 0.001);
        assert_eq!(snapshot.overall_rounded(), 17);
        assert_eq!(snapshot.level, Level::Basic);
        assert_eq!(
            snapshot.achievements,
            BTreeSet::from([Achievement::FirstStep, Achievement::Scholar])
        );
    }

    #[test]
    fn everything_completed_is_master() {
        let snapshot = derive(10, 20, TOTALS);

        assert_eq!(snapshot.overall_progress, 100.0);
        assert_eq!(snapshot.level, Level::Master);
        assert!(Achievement::ALL.into_iter().all(|a| snapshot.has(a)));
    }

    #[test]
    fn nothing_completed_is_beginner() {
        let snapshot = derive(0, 0, TOTALS);

        assert_eq!(snapshot.level, Level::Beginner);
        assert!(snapshot.achievements.is_empty());
    }

    #[test]
    fn level_bands_follow_overall_progress() {
        assert_eq!(Level::from_progress(0.0), Level::Beginner);
        assert_eq!(Level::from_progress(0.1), Level::Basic);
        assert_eq!(Level::from_progress(24.99), Level::Basic);
        assert_eq!(Level::from_progress(25.0), Level::Intermediate);
        assert_eq!(Level::from_progress(50.0), Level::Advanced);
        assert_eq!(Level::from_progress(74.99), Level::Advanced);
        assert_eq!(Level::from_progress(75.0), Level::Expert);
        assert_eq!(Level::from_progress(99.99), Level::Expert);
        assert_eq!(Level::from_progress(100.0), Level::Master);
    }

    #[test]
    fn explorer_and_halfway_are_independent_of_steps() {
        let snapshot = derive(0, 15, TOTALS);

        assert_eq!(snapshot.overall_progress, 50.0);
        assert!(snapshot.has(Achievement::Explorer));
        assert!(snapshot.has(Achievement::Halfway));
        assert!(!snapshot.has(Achievement::Scholar));
        assert!(!snapshot.has(Achievement::Master));
    }

    #[test]
    fn zero_totals_yield_zero_percent() {
        let snapshot = derive(3, 2, Totals { steps: 0, extras: 0 });

        assert_eq!(snapshot.steps_progress, 0.0);
        assert_eq!(snapshot.extras_progress, 0.0);
        assert_eq!(snapshot.overall_progress, 0.0);
        assert_eq!(snapshot.level, Level::Beginner);
        assert!(!snapshot.overall_progress.is_nan());
    }

    #[test]
    fn overall_stays_within_bounds() {
        for steps in 0..=12 {
            for extras in 0..=22 {
                let snapshot = derive(steps, extras, TOTALS);
                assert!((0.0..=100.0).contains(&snapshot.overall_progress));
                assert!((0.0..=100.0).contains(&snapshot.steps_progress));
                assert!((0.0..=100.0).contains(&snapshot.extras_progress));
            }
        }
    }

    #[test]
    fn achievement_ids_serialize_as_kebab_case() {
        let json = serde_json::to_string(&Achievement::FirstStep).expect("serialize");

        assert_eq!(json, "\"first-step\"");
        assert_eq!(Achievement::FirstStep.id(), "first-step");
    }
}
