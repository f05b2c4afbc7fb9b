use super::deriver::{Achievement, ProgressSnapshot};
use chrono::{DateTime, Local, Utc};

const BAR_WIDTH: usize = 20;

pub fn render_summary(snapshot: &ProgressSnapshot, last_activity: Option<DateTime<Utc>>) -> String {
    let achievement_rows = if snapshot.achievements.is_empty() {
        "- None unlocked yet".to_string()
    } else {
        Achievement::ALL
            .iter()
            .filter(|achievement| snapshot.has(**achievement))
            .map(|achievement| format!("- {} ({})", achievement.title(), achievement.id()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "# Progress Stats\n\n- Level: {} ({}%)\n- Main steps: {}/{} {} {:.0}%\n- Extra topics: {}/{} {} {:.0}%\n- Last activity: {}\n\n## Achievements\n{}\n",
        snapshot.level.title(),
        snapshot.overall_rounded(),
        snapshot.completed_steps,
        snapshot.total_steps,
        progress_bar(snapshot.steps_progress),
        snapshot.steps_progress,
        snapshot.completed_extras,
        snapshot.total_extras,
        progress_bar(snapshot.extras_progress),
        snapshot.extras_progress,
        format_last_activity(last_activity),
        achievement_rows
    )
}

pub fn format_last_activity(last_activity: Option<DateTime<Utc>>) -> String {
    last_activity
        .map(|timestamp| {
            timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d")
                .to_string()
        })
        .unwrap_or_else(|| "Never".to_string())
}

pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::{format_last_activity, progress_bar, render_summary};
    use crate::progress::Totals;
    use crate::progress::deriver::derive;

    #[test]
    fn renders_level_counts_and_achievements() {
        let snapshot = derive(
            5,
            0,
            Totals {
                steps: 10,
                extras: 20,
            },
        );
        let rendered = render_summary(&snapshot, None);

        assert!(rendered.contains("- Level: Basic (17%)"));
        assert!(rendered.contains("- Main steps: 5/10 [##########----------] 50%"));
        assert!(rendered.contains("- First Step (first-step)"));
        assert!(rendered.contains("- Scholar (scholar)"));
        assert!(!rendered.contains("Explorer"));
        assert!(rendered.contains("- Last activity: Never"));
    }

    #[test]
    fn bar_is_clamped() {
        assert_eq!(progress_bar(0.0), format!("[{}]", "-".repeat(20)));
        assert_eq!(progress_bar(250.0), format!("[{}]", "#".repeat(20)));
    }

    #[test]
    fn missing_activity_reads_never() {
        assert_eq!(format_last_activity(None), "Never");
    }
}
