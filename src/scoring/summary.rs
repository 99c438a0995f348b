use crate::scoring::types::*;

/// Reduce finalized (or still-live) verdicts into counts, percentage and grade.
pub fn summarize<'a, I>(records: I) -> ScoreSummary
where
    I: IntoIterator<Item = &'a FeedbackRecord>,
{
    let mut total = 0u32;
    let mut matched = 0u32;
    let mut miss_high = 0u32;
    let mut miss_low = 0u32;
    let mut no_input = 0u32;
    let mut cents: Vec<f64> = Vec::new();

    for record in records {
        total += 1;
        match record.result {
            FeedbackKind::Match => matched += 1,
            FeedbackKind::MissHigh => miss_high += 1,
            FeedbackKind::MissLow => miss_low += 1,
            FeedbackKind::NoInput => no_input += 1,
        }
        if let Some(c) = record.cents_off {
            cents.push(c);
        }
    }

    let percentage = if total > 0 {
        (100.0 * matched as f64 / total as f64).round() as u32
    } else {
        0
    };
    let grade = GradeTier::for_percentage(percentage);

    let avg_cents_off = if !cents.is_empty() {
        cents.iter().sum::<f64>() / cents.len() as f64
    } else {
        0.0
    };

    let pitch_tendency = if avg_cents_off > 10.0 {
        PitchTendency::Sharp
    } else if avg_cents_off < -10.0 {
        PitchTendency::Flat
    } else {
        PitchTendency::Accurate
    };

    let feedback = coaching_lines(total, percentage, no_input, &cents, avg_cents_off);

    ScoreSummary {
        total,
        matched,
        miss_high,
        miss_low,
        no_input,
        percentage,
        grade,
        avg_cents_off,
        pitch_tendency,
        feedback,
    }
}

fn coaching_lines(
    total: u32,
    percentage: u32,
    no_input: u32,
    cents: &[f64],
    avg_cents_off: f64,
) -> Vec<String> {
    let mut feedback: Vec<String> = Vec::new();

    if total == 0 {
        feedback.push("No notes were scored. Sing along while the track plays!".to_string());
        return feedback;
    }

    if percentage >= 90 {
        feedback.push(format!("Excellent! You hit {}% of the notes.", percentage));
    } else if percentage >= 70 {
        feedback.push(format!("Nice singing! {}% of the notes were on pitch.", percentage));
    } else if percentage >= 50 {
        feedback.push(format!(
            "Keep practicing! You matched {}% of the notes.",
            percentage
        ));
    } else {
        feedback.push(format!(
            "This one's tough! You matched {}% of the notes. Try humming along first.",
            percentage
        ));
    }

    if no_input > 0 {
        feedback.push(format!(
            "We couldn't hear you on {} note{}. Move closer to the microphone.",
            no_input,
            if no_input == 1 { "" } else { "s" }
        ));
    }

    if !cents.is_empty() {
        let abs_avg = cents.iter().map(|c| c.abs()).sum::<f64>() / cents.len() as f64;
        if abs_avg > 30.0 {
            if avg_cents_off > 10.0 {
                feedback.push(format!(
                    "You sing about {:.0} cents sharp. Relax and aim slightly lower.",
                    avg_cents_off
                ));
            } else if avg_cents_off < -10.0 {
                feedback.push(format!(
                    "You sing about {:.0} cents flat. Support the note with more breath.",
                    avg_cents_off.abs()
                ));
            }
        }
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn rec(id: u32, kind: FeedbackKind, cents: Option<f64>) -> FeedbackRecord {
        FeedbackRecord {
            note_id: id,
            result: kind,
            recorded_at: Duration::ZERO,
            cents_off: cents,
        }
    }

    fn with_matches(matched: u32, total: u32) -> Vec<FeedbackRecord> {
        (0..total)
            .map(|i| {
                if i < matched {
                    rec(i, FeedbackKind::Match, Some(0.0))
                } else {
                    rec(i, FeedbackKind::MissLow, Some(-120.0))
                }
            })
            .collect()
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(GradeTier::for_percentage(100), GradeTier::S);
        assert_eq!(GradeTier::for_percentage(95), GradeTier::S);
        assert_eq!(GradeTier::for_percentage(94), GradeTier::APlus);
        assert_eq!(GradeTier::for_percentage(90), GradeTier::APlus);
        assert_eq!(GradeTier::for_percentage(89), GradeTier::A);
        assert_eq!(GradeTier::for_percentage(80), GradeTier::A);
        assert_eq!(GradeTier::for_percentage(70), GradeTier::B);
        assert_eq!(GradeTier::for_percentage(60), GradeTier::C);
        assert_eq!(GradeTier::for_percentage(50), GradeTier::D);
        assert_eq!(GradeTier::for_percentage(49), GradeTier::F);
        assert_eq!(GradeTier::APlus.to_string(), "A+");
    }

    #[test]
    fn test_empty_ledger() {
        let summary = summarize(&Vec::<FeedbackRecord>::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.grade, GradeTier::F);
        assert_eq!(summary.pitch_tendency, PitchTendency::Accurate);
    }

    #[test]
    fn test_percentage_rounds() {
        let summary = summarize(&with_matches(19, 20));
        assert_eq!(summary.percentage, 95);
        assert_eq!(summary.grade, GradeTier::S);

        // 2/3 = 66.67 -> 67
        let summary = summarize(&with_matches(2, 3));
        assert_eq!(summary.percentage, 67);
        assert_eq!(summary.grade, GradeTier::C);

        let summary = summarize(&with_matches(47, 50));
        assert_eq!(summary.percentage, 94);
        assert_eq!(summary.grade, GradeTier::APlus);
    }

    #[test]
    fn test_counts_each_kind() {
        let records = vec![
            rec(0, FeedbackKind::Match, Some(5.0)),
            rec(1, FeedbackKind::MissHigh, Some(80.0)),
            rec(2, FeedbackKind::MissLow, Some(-90.0)),
            rec(3, FeedbackKind::NoInput, None),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.miss_high, 1);
        assert_eq!(summary.miss_low, 1);
        assert_eq!(summary.no_input, 1);
        assert_eq!(summary.percentage, 25);
        assert!(summary.feedback.iter().any(|f| f.contains("1 note.")));
    }

    #[test]
    fn test_flat_tendency() {
        let records = vec![
            rec(0, FeedbackKind::MissLow, Some(-60.0)),
            rec(1, FeedbackKind::Match, Some(-40.0)),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.pitch_tendency, PitchTendency::Flat);
        assert!(summary.feedback.iter().any(|f| f.contains("flat")));
    }
}
