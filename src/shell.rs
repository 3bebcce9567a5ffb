/**
 * The command-line user interface for answering multiple-choice questions.
 */
use std::io::Write;
use std::time;

use colored::*;

use super::common::Result;
use super::iohelper::{prettyprint, prettyprint_colored, prompt};
use super::quiz::QuestionItem;
use super::session::SessionRecord;


const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";


pub struct CmdUI {
    number: usize,
    time_started: time::Instant,
    /// Have we finished printing out the prologue?
    finished_prologue: bool,
    /// Title of the last passage shown, so that it is not repeated for each of its
    /// questions.
    last_passage: Option<String>,
}


impl CmdUI {
    pub fn new() -> Self {
        Self {
            number: 0,
            time_started: time::Instant::now(),
            finished_prologue: false,
            last_passage: None,
        }
    }

    /// Ask `item` and return the index of the chosen option, or `None` if the user
    /// pressed Ctrl+D. Entering `?` shows the hint.
    pub fn ask(&mut self, item: &QuestionItem) -> Result<Option<usize>> {
        if let (Some(title), Some(text)) = (item.payload_str("title"), item.payload_str("text")) {
            if self.last_passage.as_deref() != Some(title) {
                self.passage(title, text)?;
                self.last_passage = Some(title.to_string());
            }
        }

        self.text(item.prompt().unwrap_or("(no question text)"))?;
        let options = item.options();
        self.choices(&options)?;

        loop {
            let response = match self.prompt()? {
                Some(response) => response,
                None => return Ok(None),
            };

            if response == "?" {
                match item.hint() {
                    Some(hint) => self.hint(hint)?,
                    None => my_println!("No hint for this question.")?,
                }
                continue;
            }

            match parse_choice(&response, options.len()) {
                Some(choice) => return Ok(Some(choice)),
                None => my_println!("Please enter a letter.")?,
            }
        }
    }

    pub fn text(&mut self, text: &str) -> Result<()> {
        if !self.finished_prologue {
            my_print!("\n")?;
            self.finished_prologue = true;
        }
        self.time_started = time::Instant::now();
        self.number += 1;

        let prefix = format!("  ({}) ", self.number);
        prettyprint_colored(text, Some(&prefix), None, Some(Color::Cyan))?;
        my_print!("\n")
    }

    pub fn prompt(&mut self) -> Result<Option<String>> {
        prompt("> ")
    }

    pub fn choices(&mut self, choices: &[&str]) -> Result<()> {
        for (letter, choice) in LETTERS.chars().zip(choices.iter()) {
            let prefix = format!("     ({}) ", letter);
            prettyprint(choice, Some(&prefix))?;
        }
        my_print!("\n")
    }

    pub fn passage(&mut self, title: &str, text: &str) -> Result<()> {
        my_print!("\n")?;
        prettyprint_colored(title, Some("  "), Some(Color::BrightBlue), None)?;
        my_print!("\n")?;
        prettyprint(text, Some("  "))
    }

    pub fn correct(&mut self) -> Result<()> {
        prettyprint(&"Correct!".green().to_string(), None)
    }

    pub fn incorrect(&mut self, correction: Option<&str>) -> Result<()> {
        if let Some(correction) = correction {
            let message = format!(
                "{} The correct answer was {}.",
                "Incorrect.".red(),
                correction.green(),
            );
            prettyprint(&message, None)
        } else {
            prettyprint(&"Incorrect.".red().to_string(), None)
        }
    }

    pub fn hint(&mut self, text: &str) -> Result<()> {
        prettyprint_colored(text, Some("Hint: "), None, Some(Color::Yellow))
    }

    pub fn explanation(&mut self, text: &str) -> Result<()> {
        prettyprint_colored(text, Some("  "), Some(Color::BrightBlue), None)
    }

    pub fn get_elapsed(&self) -> time::Duration {
        self.time_started.elapsed()
    }

    pub fn instructions(&mut self, text: &str) -> Result<()> {
        my_print!("\n")?;
        prettyprint_colored(text, Some("  "), Some(Color::BrightBlue), None)?;
        my_print!("\n")
    }

    pub fn warning(&mut self, text: &str) -> Result<()> {
        my_print!("\n")?;
        prettyprint_colored(&format!("Warning: {}", text), Some("  "), Some(Color::Red), None)?;
        my_print!("\n")
    }

    pub fn results(&mut self, session: &SessionRecord) -> Result<()> {
        if let Some(score) = session.score() {
            let score_as_str = format!("{:.1}%", score);
            let total = session.total();

            my_print!("\n\n")?;
            my_print!("Score: ")?;
            my_print!("{}", score_as_str.cyan())?;
            my_print!(" out of ")?;
            my_print!("{}", format!("{}", total).cyan())?;
            if total == 1 {
                my_println!(" question")?;
            } else {
                my_println!(" questions")?;
            }
            my_print!("  {}", format!("{}", session.total_correct()).green())?;
            my_print!(" correct\n")?;
            my_print!("  {}", format!("{}", session.total_incorrect()).red())?;
            my_print!(" incorrect\n")?;
        }
        Ok(())
    }
}


/// Interpret `response` as a choice among `n` options, either as a letter (`b`) or as a
/// 1-based number (`2`).
pub fn parse_choice(response: &str, n: usize) -> Option<usize> {
    let response = response.trim().to_lowercase();
    if let Ok(number) = response.parse::<usize>() {
        return if number >= 1 && number <= n { Some(number - 1) } else { None };
    }

    let mut chars = response.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => LETTERS.find(c).filter(|i| *i < n),
        _ => None,
    }
}
