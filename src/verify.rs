/**
 * Structural checks on question banks, run by the `check` subcommand before a bank is
 * put into use.
 */
use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use super::quiz::{Bank, QuestionItem};


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Critical,
}


#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    /// Id of the offending question, if it has one.
    pub id: Option<String>,
    pub severity: Severity,
    pub message: String,
}


impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.id.as_deref().unwrap_or("<no id>"), self.message)
    }
}


#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Number of questions checked, including passage questions.
    pub checked: usize,
    pub issues: Vec<Issue>,
}


impl Report {
    /// `true` if there are no critical issues. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.critical().next().is_none()
    }

    pub fn critical(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Critical)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    fn push(&mut self, item: &QuestionItem, severity: Severity, message: String) {
        self.issues.push(Issue { id: item.id.clone(), severity, message });
    }
}


/// Check every question of `bank` and return what was found.
pub fn verify_bank(bank: &Bank) -> Report {
    let mut report = Report::default();

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for item in bank.items.iter() {
        if let Some(id) = item.id() {
            *seen.entry(id).or_insert(0) += 1;
        }
    }
    for passage in bank.passages.iter() {
        if let Some(id) = passage.id.as_deref() {
            *seen.entry(id).or_insert(0) += 1;
        }
        for q in passage.questions.iter() {
            if let Some(id) = q.id() {
                *seen.entry(id).or_insert(0) += 1;
            }
        }
    }
    for (id, n) in seen.iter() {
        if *n > 1 {
            report.issues.push(Issue {
                id: Some(id.to_string()),
                severity: Severity::Critical,
                message: format!("id is used {} times", n),
            });
        }
    }

    let passage_questions = bank.passages.iter().flat_map(|p| p.questions.iter());
    for item in bank.items.iter().chain(passage_questions) {
        report.checked += 1;
        check_item(item, &mut report);
    }
    report
}


fn check_item(item: &QuestionItem, report: &mut Report) {
    let type_tag = item.type_tag.as_deref().unwrap_or("");
    match type_tag {
        "" | "mc" => check_multiple_choice(item, report),
        "bar-max" | "bar-compare" => {
            check_chart(item, report);
            check_multiple_choice(item, report);
        }
        "dnd" => {
            if !is_list_of_at_least(item.payload.get("tiles"), 2) {
                report.push(item, Severity::Critical, String::from("dnd question needs at least 2 tiles"));
            }
            if !is_list_of_at_least(item.payload.get("buckets"), 2) {
                report.push(item, Severity::Critical, String::from("dnd question needs at least 2 buckets"));
            }
        }
        "table-fill" => {
            let ok = match item.payload.get("table") {
                Some(Value::Object(table)) => {
                    table.get("headers").map_or(false, Value::is_array)
                        && table.get("rows").map_or(false, Value::is_array)
                }
                _ => false,
            };
            if !ok {
                report.push(item, Severity::Critical, String::from("table-fill question needs table.headers and table.rows"));
            }
        }
        "pie-assign" => {
            let ok = item.payload.get("slices").map_or(false, Value::is_array)
                && item.payload.get("buckets").map_or(false, Value::is_array);
            if !ok {
                report.push(item, Severity::Critical, String::from("pie-assign question needs slices and buckets"));
            }
        }
        "chance-matrix" => {
            let ok = item.payload.get("matrix").map_or(false, Value::is_array)
                && item.payload_str("question").is_some();
            if !ok {
                report.push(item, Severity::Critical, String::from("chance-matrix question needs matrix and question"));
            }
        }
        other => {
            report.push(item, Severity::Critical, format!("unknown type '{}'", other));
        }
    }

    if item.hint().is_none() {
        report.push(item, Severity::Warning, String::from("no hint"));
    }
    let interactive = type_tag == "dnd" || type_tag == "table-fill" || type_tag == "pie-assign";
    if item.explanation().is_none() && !interactive {
        report.push(item, Severity::Warning, String::from("no explanation"));
    }
}


fn check_multiple_choice(item: &QuestionItem, report: &mut Report) {
    let options = match item.payload.get("options") {
        Some(Value::Array(options)) if options.len() >= 2 => options,
        _ => {
            report.push(item, Severity::Critical, String::from("needs at least 2 options"));
            return;
        }
    };

    let in_range = match item.payload.get("correct").and_then(Value::as_i64) {
        Some(i) => i >= 0 && (i as usize) < options.len(),
        None => false,
    };
    if !in_range {
        report.push(
            item,
            Severity::Critical,
            format!("'correct' must be an index in [0, {}]", options.len() - 1),
        );
    }

    for (i, option) in options.iter().enumerate() {
        if !is_nonblank_str(option) {
            report.push(item, Severity::Critical, format!("options[{}] is not a non-empty string", i));
        }
    }
}


fn check_chart(item: &QuestionItem, report: &mut Report) {
    let chart = match item.payload.get("chart") {
        Some(Value::Object(chart)) => chart,
        _ => {
            report.push(item, Severity::Critical, String::from("chart question has no chart"));
            return;
        }
    };

    let (labels, values) = match (chart.get("labels"), chart.get("values")) {
        (Some(Value::Array(labels)), Some(Value::Array(values)))
            if labels.len() == values.len() && labels.len() >= 2 =>
        {
            (labels, values)
        }
        _ => {
            report.push(
                item,
                Severity::Critical,
                String::from("chart.labels and chart.values must be lists of the same length, at least 2"),
            );
            return;
        }
    };

    if !labels.iter().all(is_nonblank_str) {
        report.push(item, Severity::Critical, String::from("chart.labels must be strings"));
    }
    let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.len() != values.len() || numbers.iter().any(|v| *v < 0.0) {
        report.push(item, Severity::Critical, String::from("chart.values must be non-negative numbers"));
        return;
    }

    match item.type_tag.as_deref() {
        Some("bar-max") => check_bar_max(item, labels, &numbers, report),
        Some("bar-compare") => check_bar_compare(item, labels, &numbers, report),
        _ => {}
    }
}


fn check_bar_max(item: &QuestionItem, labels: &[Value], values: &[f64], report: &mut Report) {
    let options_match = match item.payload.get("options") {
        Some(Value::Array(options)) => {
            options.len() == labels.len()
                && options.iter().zip(labels.iter()).all(|(o, l)| value_text(o) == value_text(l))
        }
        _ => false,
    };
    if !options_match {
        report.push(item, Severity::Critical, String::from("options must be exactly chart.labels"));
    }

    // The first of equally tall bars counts as the tallest.
    let mut tallest = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[tallest] {
            tallest = i;
        }
    }
    if item.payload.get("correct").and_then(Value::as_u64) != Some(tallest as u64) {
        report.push(item, Severity::Critical, format!("'correct' should be {} (the tallest bar)", tallest));
    }
}


fn check_bar_compare(item: &QuestionItem, labels: &[Value], values: &[f64], report: &mut Report) {
    let options = match item.payload.get("options") {
        Some(Value::Array(options)) if options.len() >= 2 => options,
        // Reported by the multiple-choice check.
        _ => return,
    };
    let candidates: Vec<Option<i64>> = options
        .iter()
        .map(|o| o.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .collect();
    if candidates.iter().any(Option::is_none) {
        report.push(item, Severity::Critical, String::from("options must be whole numbers"));
        return;
    }

    // Work out which two bars are being compared from the labels named in the question.
    let prompt = item.prompt().unwrap_or("").to_lowercase();
    let named: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.as_str().map_or(false, |l| prompt.contains(&l.to_lowercase())))
        .map(|(i, _)| i)
        .collect();
    if named.len() < 2 {
        return;
    }

    let diff = (values[named[0]] - values[named[1]]).abs().round() as i64;
    match candidates.iter().position(|c| *c == Some(diff)) {
        Some(expected) => {
            if item.payload.get("correct").and_then(Value::as_u64) != Some(expected as u64) {
                report.push(
                    item,
                    Severity::Critical,
                    format!("'correct' should be {} (difference {})", expected, diff),
                );
            }
        }
        None => {
            report.push(item, Severity::Critical, format!("no option gives the difference {}", diff));
        }
    }
}


fn is_nonblank_str(value: &Value) -> bool {
    value.as_str().map_or(false, |s| !s.trim().is_empty())
}


fn is_list_of_at_least(value: Option<&Value>, n: usize) -> bool {
    match value {
        Some(Value::Array(list)) => list.len() >= n,
        _ => false,
    }
}


fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
