use crate::grade::Grade;
use crate::session::Outcome;

fn grade_text(grade: Option<&Grade>) -> String {
    grade.map_or_else(|| "N/A".to_string(), Grade::to_string)
}

/// Text lines shown in the result panel.
pub fn render(outcome: &Outcome) -> Vec<String> {
    if !outcome.is_batch() {
        let Some(r) = outcome.results.first() else {
            return Vec::new();
        };
        return vec![
            format!("Prediction: {}", r.label),
            format!("Percentage: {:.2}%", r.score),
            format!("Grade: {}", grade_text(r.grade.as_ref())),
        ];
    }

    let mut lines = Vec::with_capacity(outcome.results.len() + 4);
    for (name, r) in outcome.names.iter().zip(&outcome.results) {
        lines.push(format!(
            "{name}: {} ({:.2}%, grade {})",
            r.label,
            r.score,
            grade_text(r.grade.as_ref())
        ));
    }
    let overall = &outcome.overall;
    lines.push(format!("Overall prediction: {}", overall.overall_label));
    lines.push(format!("Overall percentage: {}%", overall.formatted_score()));
    lines.push(format!(
        "Overall grade: {}",
        grade_text(overall.overall_grade.as_ref())
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_results;
    use crate::wire::PerImageResult;

    fn outcome(results: Vec<PerImageResult>) -> Outcome {
        let overall = aggregate_results(&results).unwrap();
        Outcome {
            names: (0..results.len()).map(|i| format!("img{i}.jpg")).collect(),
            results,
            overall,
        }
    }

    #[test]
    fn single_image_has_three_lines() {
        let out = outcome(vec![PerImageResult {
            label: "freshBananas".into(),
            score: 0.9,
            grade: None,
        }]);
        assert_eq!(
            render(&out),
            vec!["Prediction: freshBananas", "Percentage: 0.90%", "Grade: N/A"]
        );
    }

    #[test]
    fn outcome_without_results_renders_nothing() {
        let mut out = outcome(vec![PerImageResult {
            label: "freshApples".into(),
            score: 50.0,
            grade: None,
        }]);
        out.results.clear();
        assert!(render(&out).is_empty());
    }

    #[test]
    fn batch_lists_each_image_then_overall() {
        let out = outcome(vec![
            PerImageResult {
                label: "rottenApples".into(),
                score: 91.0,
                grade: Some(Grade::from("C")),
            },
            PerImageResult {
                label: "rottenApples".into(),
                score: 64.5,
                grade: Some(Grade::from("B")),
            },
        ]);
        let lines = render(&out);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "img0.jpg: rottenApples (91.00%, grade C)");
        assert_eq!(lines[3], "Overall percentage: 77.75%");
        assert_eq!(lines[4], "Overall grade: B");
    }
}
