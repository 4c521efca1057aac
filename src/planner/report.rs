//! A rolled-over plan's counts (§4.5 `report`), and the emoji-marked text the notifier sends.

use crate::config::Horizon;

/// Counts by terminal status for one rolled-over plan, plus the derived completion ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub horizon: Horizon,
    pub completed: u32,
    pub planned: u32,
    pub postponed: u32,
    pub deleted: u32,
    pub overall_planned: u32,
    /// `completed / (completed + planned) * 100`, `0.0` on division by zero.
    pub compl_ratio: f64,
}

impl Report {
    /// The multi-line, emoji-marked text the notifier forwards verbatim (§4.5, §6).
    pub fn display_text(&self) -> String {
        format!(
            "{} plan report\n\
             \u{2705} Completed:\n{} \n\
             \u{274C} Not completed:\n{} \n\
             \u{1F4C6} Postponed:\n{} \n\
             \u{1F5D1} Deleted:\n{}\n\
             \u{1F4CB} Overall planned:\n{} \n\
             \u{1F4C8} Completion ratio:\n{:.2}%",
            self.horizon, self.completed, self.planned, self.postponed, self.deleted, self.overall_planned, self.compl_ratio
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_includes_every_section() {
        let report = Report {
            horizon: Horizon::Week,
            completed: 3,
            planned: 1,
            postponed: 2,
            deleted: 0,
            overall_planned: 6,
            compl_ratio: 75.0,
        };
        let text = report.display_text();
        assert!(text.contains("Completed:\n3"));
        assert!(text.contains("75.00%"));
    }
}
