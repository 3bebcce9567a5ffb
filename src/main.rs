/**
 * Practice questions from a bank on the command line, with the selection adapting to
 * how the learner is doing.
 */
use std::io::Write;
use std::path::Path;

use clap::Parser;
use colored::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use adaptive_drill::common::{
    is_broken_pipe, BankOptions, CheckOptions, Command, DifficultyArg, DrawOptions,
    ModeArg, Options, OutcomeArg, RecordOptions, ResetOptions, SelectOptions,
    SessionsOptions, TakeOptions,
};
use adaptive_drill::config::{
    get_app_dir_path, get_settings_path, get_store_path, require_app_dir_path, Backend,
    DifficultySetting, Settings,
};
use adaptive_drill::difficulty::rolling_accuracy;
use adaptive_drill::history::{area_history, record_outcome, reset_history, topic_history};
use adaptive_drill::iohelper::prettyprint_colored;
use adaptive_drill::quiz::{load_bank, Bank, QuestionItem};
use adaptive_drill::repetition::{clear_used_many, load_used};
use adaptive_drill::select::{select, target_tier, SelectionRequest, SessionMode};
use adaptive_drill::session::{end_session, load_sessions, SessionRecord};
use adaptive_drill::shell::CmdUI;
use adaptive_drill::verify::{verify_bank, Severity};
use adaptive_drill::weights::weakness_weights;
use adaptive_drill::{my_print, my_println, DrillError, JsonFileStore, Result, SqliteStore, Store};


/// Environment variable holding the log filter, e.g. `debug` or `adaptive_drill=trace`.
const LOG_ENV: &str = "ADAPTIVE_DRILL_LOG";


fn main() {
    let options = Options::parse();
    init_logging();

    if options.no_color {
        colored::control::set_override(false);
    }

    let dir = get_app_dir_path(options.directory.as_deref());
    let result = match options.cmd {
        Command::Draw(options) => main_draw(&dir, options).map(|_| 0),
        Command::Take(options) => main_take(&dir, options).map(|_| 0),
        Command::Record(options) => main_record(&dir, options).map(|_| 0),
        Command::Stats(options) => main_stats(&dir, options).map(|_| 0),
        Command::Reset(options) => main_reset(&dir, options).map(|_| 0),
        Command::Sessions(options) => main_sessions(&dir, options).map(|_| 0),
        Command::Check(options) => main_check(options).map(|ok| if ok { 0 } else { 1 }),
    };

    match result {
        Ok(code) => {
            if code != 0 {
                ::std::process::exit(code);
            }
        }
        Err(e) => {
            if !is_broken_pipe(&e) {
                eprintln!("{}: {}", "Error".red(), e);
                ::std::process::exit(2);
            }
        }
    }
}


fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}


/// The main function for the `draw` subcommand.
fn main_draw(dir: &Path, options: DrawOptions) -> Result<()> {
    let settings = load_settings(dir)?;
    let mut store = open_store(dir, &settings)?;
    let bank = load_bank(&options.bank_opts.bank, options.bank_opts.subject.as_deref())?;
    let pool = bank.expanded_items();
    if pool.is_empty() {
        return Err(DrillError::EmptyPool);
    }

    let request = build_request(&bank, &options.select_opts, &settings);
    let mut rng = rand::thread_rng();
    let selection = select(store.as_mut(), &mut rng, &pool, &request);

    if options.json {
        my_println!("{}", serde_json::to_string_pretty(&selection.items)?)?;
        return Ok(());
    }

    my_println!("Difficulty: {}", selection.tier.to_string().cyan())?;
    if let Some(weights) = &selection.weights {
        let mut weights: Vec<(&String, &f64)> = weights.iter().collect();
        weights.sort_by(|a, b| a.0.cmp(b.0));
        let listed: Vec<String> =
            weights.iter().map(|(area, weight)| format!("{} {:.2}", area, weight)).collect();
        my_println!("Weights: {}", listed.join(", "))?;
    }
    my_print!("\n")?;

    for (i, item) in selection.items.iter().enumerate() {
        let prefix = format!(
            "{:>3}. {} [{}, {}] ",
            i + 1,
            item.id().unwrap_or("-"),
            item.area(),
            item.difficulty,
        );
        prettyprint_colored(item.prompt().unwrap_or("-"), Some(&prefix), None, Some(Color::Cyan))?;
    }
    Ok(())
}


/// The main function for the `take` subcommand.
fn main_take(dir: &Path, options: TakeOptions) -> Result<()> {
    let settings = load_settings(dir)?;
    let mut store = open_store(dir, &settings)?;
    let bank = load_bank(&options.bank_opts.bank, options.bank_opts.subject.as_deref())?;
    let topic = bank.topic();

    let (pool, skipped): (Vec<QuestionItem>, Vec<QuestionItem>) =
        bank.expanded_items().into_iter().partition(QuestionItem::is_multiple_choice);
    if pool.is_empty() {
        return Err(DrillError::EmptyPool);
    }

    let request = build_request(&bank, &options.select_opts, &settings);
    let mut rng = rand::thread_rng();
    let selection = select(store.as_mut(), &mut rng, &pool, &request);

    let mut ui = CmdUI::new();
    if !skipped.is_empty() {
        ui.warning(&format!(
            "{} question(s) in this bank cannot be answered in the terminal and were left out.",
            skipped.len(),
        ))?;
    }
    ui.instructions(&format!(
        "{} {}: {} question(s) at {} difficulty. Answer with a letter, or ? for a hint.",
        bank.subject,
        request.mode,
        selection.items.len(),
        selection.tier,
    ))?;

    let mut session = SessionRecord::begin(request.mode, &topic);
    for item in selection.items.iter() {
        let chosen = match ui.ask(item) {
            Ok(Some(chosen)) => chosen,
            Ok(None) | Err(DrillError::ReadlineInterrupted) => break,
            Err(e) => return Err(e),
        };

        let correct_index = item.correct_index();
        let correct = correct_index == Some(chosen);
        if correct {
            ui.correct()?;
        } else {
            let options = item.options();
            ui.incorrect(correct_index.and_then(|i| options.get(i).copied()))?;
            if let Some(explanation) = item.explanation() {
                ui.explanation(explanation)?;
            }
        }
        debug!(id = ?item.id(), correct, elapsed_ms = ui.get_elapsed().as_millis() as u64, "answered");

        record_outcome(store.as_mut(), &topic, item, correct);
        session.log_answer(item, Some(chosen), correct);
    }

    ui.results(&session)?;
    if session.total() > 0 {
        end_session(store.as_mut(), session);
    }
    Ok(())
}


/// The main function for the `record` subcommand.
fn main_record(dir: &Path, options: RecordOptions) -> Result<()> {
    let settings = load_settings(dir)?;
    let mut store = open_store(dir, &settings)?;
    let bank = load_bank(&options.bank_opts.bank, options.bank_opts.subject.as_deref())?;

    let item = bank
        .find(&options.id)
        .ok_or_else(|| DrillError::QuestionNotFound(options.id.clone()))?;
    let correct = options.outcome == OutcomeArg::Correct;
    record_outcome(store.as_mut(), &bank.topic(), &item, correct);

    let outcome = if correct { "correct".green() } else { "incorrect".red() };
    my_println!("Recorded {} answer to {} ({}).", outcome, options.id, item.area())
}


/// The main function for the `stats` subcommand.
fn main_stats(dir: &Path, options: BankOptions) -> Result<()> {
    let settings = load_settings(dir)?;
    let store = open_store(dir, &settings)?;
    let bank = load_bank(&options.bank, options.subject.as_deref())?;
    let topic = bank.topic();

    my_println!("Subject: {}", bank.subject)?;

    let history = topic_history(store.as_ref(), &topic);
    match rolling_accuracy(&history, settings.accuracy_window) {
        Some(accuracy) => {
            let counted = history.len().min(settings.accuracy_window);
            my_println!(
                "Recent accuracy: {} (last {} answers)",
                format!("{:.1}%", accuracy * 100.0).cyan(),
                counted,
            )?;
        }
        None => my_println!("Recent accuracy: no answers yet")?,
    }

    let request = SelectionRequest::from_settings(&topic, SessionMode::Practice, &settings);
    let tier = target_tier(store.as_ref(), &request);
    let adaptive = if request.adaptive { " (adaptive)" } else { "" };
    my_println!("Difficulty: {}{}", tier.to_string().cyan(), adaptive)?;

    let areas = bank.areas();
    let weights = weakness_weights(store.as_ref(), &topic, &areas, settings.weakness_window);
    if !areas.is_empty() {
        my_println!("\nAreas:")?;
    }
    for area in areas.iter() {
        let history = area_history(store.as_ref(), &topic, area);
        let accuracy = match rolling_accuracy(&history, settings.weakness_window) {
            Some(accuracy) => format!("{:>5.1}%", accuracy * 100.0),
            None => String::from("    -"),
        };
        let weight = weights.get(area).copied().unwrap_or(1.0);
        my_println!(
            "  {:<20} {:>4} answers  {}  weight {:.2}",
            area,
            history.len().min(settings.weakness_window),
            accuracy,
            weight,
        )?;
    }

    my_println!("\nServed this cycle:")?;
    for mode in SessionMode::ALL.iter() {
        let served = load_used(store.as_ref(), &mode.context_key(&topic)).len();
        my_println!("  {:<10} {}", mode.as_str(), served)?;
    }
    Ok(())
}


/// The main function for the `reset` subcommand. With neither `--history` nor `--used`,
/// both are reset.
fn main_reset(dir: &Path, options: ResetOptions) -> Result<()> {
    let settings = load_settings(dir)?;
    let mut store = open_store(dir, &settings)?;
    let bank = load_bank(&options.bank_opts.bank, options.bank_opts.subject.as_deref())?;
    let topic = bank.topic();
    let both = !options.history && !options.used;

    if options.history || both {
        reset_history(store.as_mut(), &topic, &bank.areas());
        my_println!("Forgot recorded answers for {}.", bank.subject)?;
    }
    if options.used || both {
        let contexts: Vec<String> = SessionMode::ALL.iter().map(|m| m.context_key(&topic)).collect();
        clear_used_many(store.as_mut(), &contexts);
        my_println!("Forgot served questions for {}.", bank.subject)?;
    }
    Ok(())
}


/// The main function for the `sessions` subcommand.
fn main_sessions(dir: &Path, options: SessionsOptions) -> Result<()> {
    let settings = load_settings(dir)?;
    let store = open_store(dir, &settings)?;
    let bank = load_bank(&options.bank_opts.bank, options.bank_opts.subject.as_deref())?;
    let topic = bank.topic();

    let mut sessions: Vec<SessionRecord> =
        load_sessions(store.as_ref()).into_iter().filter(|s| s.topic == topic).collect();
    if sessions.is_empty() {
        return my_println!("No sessions have been recorded for {}.", bank.subject);
    }

    let skip = sessions.len().saturating_sub(options.count);
    sessions.drain(..skip);
    for session in sessions.iter().rev() {
        let score = match session.score() {
            Some(score) => format!("{:>5.1}%", score),
            None => String::from("    -"),
        };
        my_println!(
            "{}  {:<8} {}  {} of {} correct",
            session.started_at.format("%Y-%m-%d %H:%M"),
            session.mode.as_str(),
            score.cyan(),
            session.total_correct(),
            session.total(),
        )?;
    }
    Ok(())
}


/// The main function for the `check` subcommand. Returns `false` if any bank has a
/// critical issue.
fn main_check(options: CheckOptions) -> Result<bool> {
    let mut all_ok = true;
    for path in options.banks.iter() {
        let bank = match load_bank(path, options.subject.as_deref()) {
            Ok(bank) => bank,
            Err(e) => {
                my_println!("{}: {}", path.display(), e.to_string().red())?;
                all_ok = false;
                continue;
            }
        };

        let report = verify_bank(&bank);
        my_println!(
            "{} ({}): {} question(s) checked",
            path.display(),
            bank.subject,
            report.checked,
        )?;
        for issue in report.issues.iter() {
            match issue.severity {
                Severity::Critical => my_println!("  {} {}", "error:".red(), issue)?,
                Severity::Warning => my_println!("  {} {}", "warning:".yellow(), issue)?,
            }
        }

        let critical = report.critical().count();
        let warnings = report.warnings().count();
        if report.is_ok() {
            my_println!("  {} ({} warning(s))", "OK".green(), warnings)?;
        } else {
            all_ok = false;
            my_println!("  {} critical issue(s), {} warning(s)", critical, warnings)?;
        }
    }
    Ok(all_ok)
}


fn load_settings(dir: &Path) -> Result<Settings> {
    require_app_dir_path(dir)?;
    Settings::load(&get_settings_path(dir))
}


fn open_store(dir: &Path, settings: &Settings) -> Result<Box<dyn Store>> {
    let path = get_store_path(dir, settings.backend);
    debug!(path = %path.display(), "opening store");
    Ok(match settings.backend {
        Backend::Json => Box::new(JsonFileStore::open(&path)),
        Backend::Sqlite => Box::new(SqliteStore::open(&path)?),
    })
}


/// The selection request for `bank`, from the settings with any command-line overrides
/// applied.
fn build_request(bank: &Bank, options: &SelectOptions, settings: &Settings) -> SelectionRequest {
    let mode = match options.mode {
        ModeArg::Practice => SessionMode::Practice,
        ModeArg::Exam => SessionMode::Exam,
        ModeArg::Daily => SessionMode::Daily,
    };
    let mut request = SelectionRequest::from_settings(&bank.topic(), mode, settings);

    if let Some(count) = options.count {
        request.count = count;
    }
    if options.allow_repeats {
        request.no_repeat = false;
    }
    if let Some(difficulty) = options.difficulty {
        let setting = match difficulty {
            DifficultyArg::Easy => DifficultySetting::Easy,
            DifficultyArg::Standard => DifficultySetting::Standard,
            DifficultyArg::Hard => DifficultySetting::Hard,
            DifficultyArg::Adaptive => DifficultySetting::Adaptive,
        };
        let (base, adaptive) = setting.resolve();
        request.base = base;
        request.adaptive = adaptive;
    }
    request
}
