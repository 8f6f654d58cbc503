//! Line-oriented front end: renders session state and dispatches actions.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use drill_core::model::{ProgressLog, QuestionBank, Verdict};
use services::{DrillSession, DrillState, PassReport, SessionError};
use tracing::warn;

/// Parse a category selection typed by the user.
///
/// Accepts 1-based numbers or exact names separated by commas or spaces,
/// or `all`. An empty line selects nothing.
pub fn parse_selection(input: &str, choices: &[String]) -> Result<BTreeSet<String>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") || input == "*" {
        return Ok(choices.iter().cloned().collect());
    }

    let mut selected = BTreeSet::new();
    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let picked = match token.parse::<usize>() {
            Ok(n) if (1..=choices.len()).contains(&n) => &choices[n - 1],
            Ok(n) => return Err(format!("{n} is not between 1 and {}", choices.len())),
            Err(_) => choices
                .iter()
                .find(|c| c.as_str() == token)
                .ok_or_else(|| format!("unknown category: {token}"))?,
        };
        selected.insert(picked.clone());
    }
    Ok(selected)
}

fn parse_verdict(input: &str) -> Option<Verdict> {
    match input.trim().to_ascii_lowercase().as_str() {
        "r" | "right" | "y" | "yes" | "1" => Some(Verdict::Known),
        "w" | "wrong" | "n" | "no" | "0" => Some(Verdict::Unknown),
        _ => None,
    }
}

fn parse_yes_no(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "" => Some(false),
        _ => None,
    }
}

pub struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Print `text` and read one line. `None` on end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Ask which categories to drill. Empty means the user chose none.
    pub fn select_categories(&mut self, bank: &QuestionBank) -> io::Result<BTreeSet<String>> {
        let counts = bank.category_counts();
        let choices: Vec<String> = counts.keys().cloned().collect();

        writeln!(self.output, "Select categories:")?;
        for (n, (name, count)) in counts.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {name} ({count})", n + 1)?;
        }

        loop {
            let Some(line) = self.prompt("Categories ('1,3', names, 'all', empty to quit): ")? else {
                return Ok(BTreeSet::new());
            };
            match parse_selection(&line, &choices) {
                Ok(selected) => return Ok(selected),
                Err(msg) => writeln!(self.output, "{msg}")?,
            }
        }
    }

    fn show_report(&mut self, report: &PassReport) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "{report}")
    }

    /// Run the session until it terminates or input runs out.
    ///
    /// Storage failures while recording a verdict are shown and the verdict
    /// is asked for again; the session state is unchanged by a failed write.
    pub async fn drive(&mut self, session: &mut DrillSession) -> Result<(), SessionError> {
        while !session.is_terminated() {
            match session.state() {
                DrillState::Presenting { .. } => {
                    if let Some(prompt) = session.current_question() {
                        let header = format!("\n{prompt}");
                        self.line_or_stop(session, &header);
                    }
                    if session.is_terminated() {
                        break;
                    }
                    if self.prompt_or_stop(session, "Your answer: ").is_none() {
                        break;
                    }
                    let answer = format!("Correct answer: {}", session.submit_answer()?);
                    self.line_or_stop(session, &answer);
                }
                DrillState::AwaitingVerdict { .. } => {
                    let Some(line) = self.prompt_or_stop(session, "Right or wrong? [r/w]: ")
                    else {
                        break;
                    };
                    let Some(verdict) = parse_verdict(&line) else {
                        self.line_or_stop(session, "Please answer 'r' or 'w'.");
                        continue;
                    };
                    match session.record_verdict(verdict).await {
                        Ok(_) => {}
                        Err(SessionError::Progress(err)) => {
                            warn!(error = %err, "verdict not saved");
                            let msg = format!("Could not save progress ({err}); please try again.");
                            self.line_or_stop(session, &msg);
                        }
                        Err(other) => return Err(other),
                    }
                }
                DrillState::Finished => {
                    if let Some(report) = session.take_report() {
                        if self.show_report(&report).is_err() {
                            session.terminate();
                            break;
                        }
                    }
                    if !session.has_retry_offer() {
                        session.decline_retry()?;
                        continue;
                    }
                    let Some(line) = self.prompt_or_stop(
                        session,
                        "Do you want to retry the incorrectly answered questions? [y/N]: ",
                    ) else {
                        break;
                    };
                    match parse_yes_no(&line) {
                        Some(true) => {
                            session.accept_retry()?;
                            let progress = session.progress();
                            let banner = format!(
                                "\nRetry pass {} ({} to go)",
                                progress.pass, progress.remaining
                            );
                            self.line_or_stop(session, &banner);
                        }
                        Some(false) => session.decline_retry()?,
                        None => {}
                    }
                }
                DrillState::Terminated => break,
            }
        }
        Ok(())
    }

    /// Prompt, terminating the session on end of input or a broken terminal.
    fn prompt_or_stop(&mut self, session: &mut DrillSession, text: &str) -> Option<String> {
        match self.prompt(text) {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                session.terminate();
                None
            }
            Err(err) => {
                warn!(error = %err, "terminal input failed");
                session.terminate();
                None
            }
        }
    }

    fn line_or_stop(&mut self, session: &mut DrillSession, text: &str) {
        if let Err(err) = writeln!(self.output, "{text}") {
            warn!(error = %err, "terminal output failed");
            session.terminate();
        }
    }

    pub fn print_history(&mut self, log: &ProgressLog) -> io::Result<()> {
        if log.is_empty() {
            return writeln!(self.output, "No progress recorded yet.");
        }
        for (n, entry) in log.entries().enumerate() {
            let report = PassReport::new(entry.known.len(), entry.answered());
            writeln!(
                self.output,
                "#{:<3} {}  known {:>3}  unknown {:>3}  ({:.2}%)",
                n + 1,
                entry.started_at.format("%Y-%m-%d %H:%M"),
                entry.known.len(),
                entry.unknown.len(),
                report.percentage
            )?;
        }
        let totals = log.lifetime_totals();
        writeln!(
            self.output,
            "{} entries, {} right, {} wrong",
            totals.entries, totals.known, totals.unknown
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    use drill_core::model::QuestionId;
    use drill_core::time::{fixed_clock, fixed_now};
    use services::{ProgressStore, SessionPlanner};
    use storage::repository::InMemoryRepository;

    fn choices() -> Vec<String> {
        vec!["Heart".into(), "Lung".into(), "Spleen".into()]
    }

    #[test]
    fn selection_by_number_name_and_all() {
        assert_eq!(
            parse_selection("1, 3", &choices()).unwrap(),
            BTreeSet::from(["Heart".to_owned(), "Spleen".to_owned()])
        );
        assert_eq!(
            parse_selection("Lung", &choices()).unwrap(),
            BTreeSet::from(["Lung".to_owned()])
        );
        assert_eq!(parse_selection("ALL", &choices()).unwrap().len(), 3);
        assert!(parse_selection("  ", &choices()).unwrap().is_empty());
        assert!(parse_selection("4", &choices()).is_err());
        assert!(parse_selection("Liver", &choices()).is_err());
    }

    async fn session_over(source: &str) -> (DrillSession, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let store = ProgressStore::load_or_create(repo.clone(), fixed_clock())
            .await
            .unwrap();
        let bank = Arc::new(QuestionBank::parse(source).unwrap());
        let categories = bank.all_categories();
        let session =
            DrillSession::start(bank, categories, store, &mut SessionPlanner::with_seed(1))
                .unwrap();
        (session, repo)
    }

    #[tokio::test]
    async fn scripted_run_with_retry() {
        let (mut session, repo) = session_over("A;q0;a0\n").await;
        let script = "my guess\nw\ny\nsecond try\nr\n";
        let mut term = Terminal::new(Cursor::new(script), Vec::new());

        term.drive(&mut session).await.unwrap();

        assert!(session.is_terminated());
        let out = String::from_utf8(term.into_output()).unwrap();
        assert!(out.contains("Question 1/1: q0"));
        assert!(out.contains("Correct answer: a0"));
        assert!(out.contains("You answered 0.00% of the questions right."));
        assert!(out.contains("Retry pass 2 (1 to go)"));
        assert!(out.contains("Congratulations! You answered 100.00% of the questions right."));

        let stored = repo.stored().unwrap();
        assert_eq!(stored.time.len(), 2);
        assert_eq!(stored.unknown[0], vec![QuestionId::new(0)]);
        assert_eq!(stored.known[1], vec![QuestionId::new(0)]);
    }

    #[tokio::test]
    async fn invalid_verdict_is_asked_again() {
        let (mut session, repo) = session_over("A;q0;a0\n").await;
        let mut term = Terminal::new(Cursor::new("x\nmaybe\nr\n"), Vec::new());

        term.drive(&mut session).await.unwrap();

        let out = String::from_utf8(term.into_output()).unwrap();
        assert!(out.contains("Please answer 'r' or 'w'."));
        assert_eq!(repo.save_count(), 1);
        assert!(session.is_terminated());
    }

    #[tokio::test]
    async fn end_of_input_terminates_without_losing_verdicts() {
        let (mut session, repo) = session_over("A;q0;a0\nA;q1;a1\n").await;
        let mut term = Terminal::new(Cursor::new("guess\nr\n"), Vec::new());

        term.drive(&mut session).await.unwrap();

        assert!(session.is_terminated());
        assert_eq!(repo.stored().unwrap().known[0].len(), 1);
    }

    #[test]
    fn select_categories_reprompts_on_bad_input() {
        let bank = QuestionBank::parse("Lung;q;a\nHeart;q;a\nLung;q2;a2\n").unwrap();
        let mut term = Terminal::new(Cursor::new("7\n2\n"), Vec::new());

        let selected = term.select_categories(&bank).unwrap();

        assert_eq!(selected, BTreeSet::from(["Lung".to_owned()]));
        let out = String::from_utf8(term.into_output()).unwrap();
        assert!(out.contains(" 1) Heart (1)"));
        assert!(out.contains(" 2) Lung (2)"));
        assert!(out.contains("7 is not between 1 and 2"));
    }

    #[test]
    fn history_lists_entries() {
        let log = drill_core::model::ProgressLog::from_persisted(
            vec![fixed_now()],
            vec![vec![QuestionId::new(0), QuestionId::new(1), QuestionId::new(2)]],
            vec![vec![QuestionId::new(3)]],
        )
        .unwrap();
        let mut term = Terminal::new(Cursor::new(""), Vec::new());

        term.print_history(&log).unwrap();

        let out = String::from_utf8(term.into_output()).unwrap();
        assert!(out.contains("2023-11-14 22:13"));
        assert!(out.contains("(75.00%)"));
        assert!(out.contains("1 entries, 3 right, 1 wrong"));
    }
}
