use std::fmt::Write as _;

use serde::Serialize;

use crate::scenario::Outcome;

/// Qualitative band of a lead score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadGrade {
    /// 8 and above.
    Excellent,
    /// 5 to 7.
    Good,
    /// Below 5.
    Low,
}

impl LeadGrade {
    /// Band for `score`.
    #[must_use]
    pub const fn for_score(score: u8) -> Self {
        match score {
            8.. => Self::Excellent,
            5..=7 => Self::Good,
            _ => Self::Low,
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Low => "low",
        }
    }
}

/// Presentation of a scenario outcome, shown once playback completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    /// Action taken, e.g. "Emergency Service Dispatched".
    pub headline: String,
    /// Lead score out of 10.
    pub score: u8,
    /// Score band.
    pub grade: LeadGrade,
    /// Score as a whole percentage.
    pub percentage: u8,
    /// Intent label.
    pub intent: &'static str,
    /// Captured CRM facts in display order.
    pub facts: Vec<(&'static str, String)>,
}

impl From<&Outcome> for OutcomeSummary {
    fn from(outcome: &Outcome) -> Self {
        let score = outcome.lead_score.min(10);
        Self {
            headline: outcome.action_taken.clone(),
            score,
            grade: LeadGrade::for_score(score),
            percentage: score * 10,
            intent: outcome.intent.label(),
            facts: outcome.facts(),
        }
    }
}

impl OutcomeSummary {
    /// Plain-text card for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Outcome: {}", self.headline);
        let _ = writeln!(
            out,
            "Lead score: {}/10 ({}, {}%)",
            self.score,
            self.grade.label(),
            self.percentage
        );
        let _ = writeln!(out, "Intent: {}", self.intent);
        if !self.facts.is_empty() {
            let width = self.facts.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
            out.push_str("Captured:\n");
            for (label, value) in &self.facts {
                let _ = writeln!(out, "  {label:<width$}  {value}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{Intent, Urgency};

    #[test]
    fn grades_follow_score_bands() {
        assert_eq!(LeadGrade::for_score(10), LeadGrade::Excellent);
        assert_eq!(LeadGrade::for_score(8), LeadGrade::Excellent);
        assert_eq!(LeadGrade::for_score(7), LeadGrade::Good);
        assert_eq!(LeadGrade::for_score(5), LeadGrade::Good);
        assert_eq!(LeadGrade::for_score(4), LeadGrade::Low);
        assert_eq!(LeadGrade::for_score(0), LeadGrade::Low);
    }

    #[test]
    fn summary_renders_card() {
        let outcome = Outcome::new(10, Intent::Emergency, "Emergency Service Dispatched")
            .name("David Chen")
            .urgency(Urgency::High);
        let summary = OutcomeSummary::from(&outcome);
        assert_eq!(summary.percentage, 100);
        assert_eq!(summary.intent, "emergency");
        let text = summary.render_text();
        assert!(text.starts_with("Outcome: Emergency Service Dispatched\n"));
        assert!(text.contains("Lead score: 10/10 (excellent, 100%)"));
        assert!(text.contains("  Name     David Chen"));
        assert!(text.contains("  Urgency  high"));
    }

    #[test]
    fn deserialized_scores_are_capped() {
        let outcome: Outcome = serde_json::from_str(
            r#"{ "lead_score": 42, "intent": "pricing", "action_taken": "Quote Sent" }"#,
        )
        .unwrap();
        let summary = OutcomeSummary::from(&outcome);
        assert_eq!(summary.score, 10);
        assert!(!summary.render_text().contains("Captured"));
    }
}
