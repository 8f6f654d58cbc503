use std::fmt;

/// Aggregated view of the current pass, useful for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassProgress {
    pub pass: usize,
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_finished: bool,
}

/// The question currently shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionPrompt<'a> {
    /// 1-based position within the pass.
    pub position: usize,
    pub total: usize,
    pub category: &'a str,
    pub question: &'a str,
}

impl fmt::Display for QuestionPrompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Question {}/{}: {}",
            self.position, self.total, self.question
        )
    }
}

/// Result of a finished pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    pub known: usize,
    pub total: usize,
    pub percentage: f64,
}

impl PassReport {
    /// Score `known` answers against the pass length.
    #[must_use]
    pub fn new(known: usize, total: usize) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let percentage = if total == 0 {
            0.0
        } else {
            known as f64 / total as f64 * 100.0
        };
        Self {
            known,
            total,
            percentage,
        }
    }

    /// True when more than half of the pass was answered correctly.
    #[must_use]
    pub fn is_congratulation(&self) -> bool {
        self.percentage > 50.0
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_congratulation() {
            write!(
                f,
                "Congratulations! You answered {:.2}% of the questions right.",
                self.percentage
            )
        } else {
            write!(
                f,
                "You answered {:.2}% of the questions right.",
                self.percentage
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_question_boundaries() {
        assert_eq!(format!("{:.2}", PassReport::new(1, 1).percentage), "100.00");
        assert_eq!(format!("{:.2}", PassReport::new(0, 1).percentage), "0.00");
    }

    #[test]
    fn message_wording_switches_above_half() {
        assert_eq!(
            PassReport::new(1, 2).to_string(),
            "You answered 50.00% of the questions right."
        );
        assert_eq!(
            PassReport::new(2, 3).to_string(),
            "Congratulations! You answered 66.67% of the questions right."
        );
    }

    #[test]
    fn prompt_header() {
        let prompt = QuestionPrompt {
            position: 2,
            total: 5,
            category: "Lung",
            question: "LU 1?",
        };
        assert_eq!(prompt.to_string(), "Question 2/5: LU 1?");
    }
}
