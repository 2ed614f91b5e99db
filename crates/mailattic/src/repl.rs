//! The interactive prompt.
//!
//! A line-oriented rendition of the selection form: pick a source and a
//! destination from numbered listings, flip toggles, then fire scan,
//! move, and provision commands at the engine. Operations run on engine
//! workers and report when they finish, so the prompt stays live while
//! one is in flight; `status` shows the engine's coarse status text and
//! `cancel` stops the current operation at the next item boundary.

use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use mailattic_core::{
    CANONICAL_FOLDERS, Command, CommandOutcome, Engine, MoveOutcome, ProvisionReport, ScanReport,
    YearOutcome, is_archivable,
};

use crate::config::Settings;

/// One parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Stores,
    Source(usize),
    Dest(usize),
    Year(Option<i32>),
    DryRun(bool),
    Filter(bool),
    Create(bool),
    Scan,
    Move,
    Provision,
    Cancel,
    Status,
    Help,
    Quit,
    Nothing,
}

/// Prompt state: the engine, current selections, and cached listings.
pub struct Repl {
    engine: Arc<Engine>,
    settings: Settings,
    status: watch::Receiver<String>,
    stores: Vec<String>,
    candidates: Vec<String>,
    source: Option<String>,
    dest: Option<String>,
    running: Vec<JoinHandle<()>>,
}

impl Repl {
    /// Builds a prompt over an engine and the persisted settings.
    #[must_use]
    pub fn new(engine: Arc<Engine>, settings: Settings) -> Self {
        let status = engine.status();
        Self {
            engine,
            settings,
            status,
            stores: Vec::new(),
            candidates: Vec::new(),
            source: None,
            dest: None,
            running: Vec::new(),
        }
    }

    /// Runs the prompt until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error when the terminal itself fails; command failures
    /// are rendered, not propagated.
    pub async fn run(&mut self) -> Result<()> {
        self.refresh_stores().await;
        println!("type help for commands");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.running.retain(|task| !task.is_finished());
            print!("mailattic> ");
            io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else { break };
            match parse_input(&line) {
                Ok(Input::Quit) => break,
                Ok(input) => self.apply(input).await,
                Err(message) => println!("{message}"),
            }
        }

        // Let in-flight operations report before the process leaves.
        for task in self.running.drain(..) {
            let _ = task.await;
        }
        Ok(())
    }

    async fn apply(&mut self, input: Input) {
        match input {
            Input::Nothing | Input::Quit => {}
            Input::Stores => self.refresh_stores().await,
            Input::Source(index) => self.select_source(index).await,
            Input::Dest(index) => self.select_dest(index),
            Input::Year(year) => {
                self.settings.override_year = year;
                self.save_settings();
                match year {
                    Some(year) => println!("target year pinned to {year}"),
                    None => println!("target year follows the destination name"),
                }
            }
            Input::DryRun(enabled) => {
                self.settings.dry_run = enabled;
                self.save_settings();
                println!("dry run {}", toggle_word(enabled));
            }
            Input::Filter(enabled) => {
                self.settings.filter_destinations_by_account = enabled;
                self.save_settings();
                println!("destination filter {}", toggle_word(enabled));
                self.refresh_candidates().await;
            }
            Input::Create(enabled) => {
                self.settings.create_missing_archives = enabled;
                self.save_settings();
                println!("archive creation {}", toggle_word(enabled));
            }
            Input::Scan => self.dispatch(Command::ScanRequested),
            Input::Move => self.request_move(),
            Input::Provision => self.request_provision(),
            Input::Cancel => {
                self.engine.cancel_token().cancel();
                println!("cancel requested; the operation stops at the next item");
            }
            Input::Status => self.print_status(),
            Input::Help => print_help(),
        }
    }

    /// Re-lists stores and resets both selections; a refreshed listing
    /// may renumber everything.
    async fn refresh_stores(&mut self) {
        match self.engine.store_names().await {
            Ok(names) => {
                self.stores = names;
                self.source = None;
                self.dest = None;
                self.candidates.clear();
                println!("stores:");
                print_numbered(&self.stores);
            }
            Err(error) => println!("{}: {error}", error.title()),
        }
    }

    async fn select_source(&mut self, index: usize) {
        let Some(name) = self.stores.get(index).cloned() else {
            println!("no store {} in the listing (try stores)", index + 1);
            return;
        };
        println!("source: {name}");
        self.source = Some(name);
        self.refresh_candidates().await;
    }

    fn select_dest(&mut self, index: usize) {
        if self.source.is_none() {
            println!("pick a source first");
            return;
        }
        let Some(name) = self.candidates.get(index).cloned() else {
            println!("no destination {} in the listing", index + 1);
            return;
        };
        println!("dest: {name}");
        self.dest = Some(name);
    }

    async fn refresh_candidates(&mut self) {
        self.candidates.clear();
        self.dest = None;
        let Some(source) = self.source.clone() else { return };
        let filtered = self.settings.filter_destinations_by_account;
        match self.engine.destination_candidates(source, filtered).await {
            Ok(candidates) => {
                self.candidates = candidates;
                println!("destinations:");
                print_numbered(&self.candidates);
            }
            Err(error) => println!("{}: {error}", error.title()),
        }
    }

    fn request_move(&mut self) {
        let (Some(source), Some(destination)) = (self.source.clone(), self.dest.clone()) else {
            println!("pick a source and a destination first");
            return;
        };
        self.dispatch(Command::MoveRequested {
            source,
            destination,
            override_year: self.settings.override_year,
            dry_run: self.settings.dry_run,
        });
    }

    fn request_provision(&mut self) {
        if !self.settings.create_missing_archives {
            println!("archive creation is off (create on to allow it)");
            return;
        }
        let Some(source) = self.source.clone() else {
            println!("pick a source first");
            return;
        };
        self.dispatch(Command::ProvisionRequested { source, dry_run: self.settings.dry_run });
    }

    fn dispatch(&mut self, command: Command) {
        let engine = Arc::clone(&self.engine);
        self.running.push(tokio::spawn(async move {
            match engine.dispatch(command).await {
                Ok(outcome) => print!("{}", render_outcome(&outcome)),
                Err(error) => println!("{}: {error}", error.title()),
            }
        }));
    }

    fn print_status(&self) {
        println!("engine: {}", *self.status.borrow());
        println!("source: {}", self.source.as_deref().unwrap_or("(none)"));
        println!("dest:   {}", self.dest.as_deref().unwrap_or("(none)"));
        match self.settings.override_year {
            Some(year) => println!("year:   {year}"),
            None => println!("year:   from destination name"),
        }
        println!(
            "dryrun {}  filter {}  create {}",
            toggle_word(self.settings.dry_run),
            toggle_word(self.settings.filter_destinations_by_account),
            toggle_word(self.settings.create_missing_archives),
        );
    }

    fn save_settings(&self) {
        if let Err(error) = self.settings.save() {
            tracing::warn!(%error, "settings not saved");
        }
    }
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(Input::Nothing);
    };
    let argument = words.next();
    if words.next().is_some() {
        return Err(format!("too many words after {keyword}"));
    }
    if let Some(input) = bare_input(keyword) {
        return if argument.is_some() {
            Err(format!("{keyword} takes no argument"))
        } else {
            Ok(input)
        };
    }
    match keyword {
        "source" => parse_index(argument).map(Input::Source),
        "dest" => parse_index(argument).map(Input::Dest),
        "year" => parse_year(argument).map(Input::Year),
        "dryrun" => parse_toggle(argument).map(Input::DryRun),
        "filter" => parse_toggle(argument).map(Input::Filter),
        "create" => parse_toggle(argument).map(Input::Create),
        other => Err(format!("unknown command: {other} (try help)")),
    }
}

fn bare_input(keyword: &str) -> Option<Input> {
    match keyword {
        "stores" => Some(Input::Stores),
        "scan" => Some(Input::Scan),
        "move" => Some(Input::Move),
        "provision" => Some(Input::Provision),
        "cancel" => Some(Input::Cancel),
        "status" => Some(Input::Status),
        "help" => Some(Input::Help),
        "quit" | "exit" => Some(Input::Quit),
        _ => None,
    }
}

fn parse_index(argument: Option<&str>) -> Result<usize, String> {
    let Some(word) = argument else {
        return Err("expected a number from the listing".to_string());
    };
    match word.parse::<usize>() {
        Ok(number) if number >= 1 => Ok(number - 1),
        _ => Err(format!("not a listing number: {word}")),
    }
}

fn parse_year(argument: Option<&str>) -> Result<Option<i32>, String> {
    match argument {
        Some("clear") => Ok(None),
        Some(word) => match word.parse::<i32>() {
            Ok(year) if (1000..=9999).contains(&year) => Ok(Some(year)),
            _ => Err(format!("not a four-digit year: {word}")),
        },
        None => Err("expected a four-digit year or clear".to_string()),
    }
}

fn parse_toggle(argument: Option<&str>) -> Result<bool, String> {
    match argument {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err("expected on or off".to_string()),
    }
}

fn print_numbered(names: &[String]) {
    if names.is_empty() {
        println!("  (none)");
        return;
    }
    for (position, name) in names.iter().enumerate() {
        let mark = if is_archivable(name) { "  [archive]" } else { "" };
        println!("{:>3}. {name}{mark}", position + 1);
    }
}

fn print_help() {
    println!("stores             refresh and list every store");
    println!("source <n>         pick the move/provision source by number");
    println!("dest <n>           pick the move destination by number");
    println!("year <yyyy>|clear  pin the target year, or derive it again");
    println!("dryrun on|off      count matches without relocating");
    println!("filter on|off      limit destinations to the source account");
    println!("create on|off      allow provisioning to create archives");
    println!("scan               count items in every store by folder and year");
    println!("move               move the target year's items to the destination");
    println!("provision          create missing yearly archives for the source");
    println!("cancel             stop the running operation between items");
    println!("status             engine status, selections, and toggles");
    println!("quit               leave");
}

fn render_outcome(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Scan(report) => render_scan(report),
        CommandOutcome::Move(outcome) => render_move(outcome),
        CommandOutcome::Provision(report) => render_provision(report),
    }
}

fn render_scan(report: &ScanReport) -> String {
    let mut out = String::new();
    if report.rows.is_empty() {
        out.push_str("scan: nothing to count\n");
    } else {
        let store_width =
            report.rows.iter().map(|row| row.store.len()).max().unwrap_or(0).max("store".len());
        let folder_width =
            report.rows.iter().map(|row| row.folder.len()).max().unwrap_or(0).max("folder".len());
        let _ =
            writeln!(out, "{:<store_width$}  {:<folder_width$}  year  items", "store", "folder");
        for row in &report.rows {
            let _ = writeln!(
                out,
                "{:<store_width$}  {:<folder_width$}  {}  {:>5}",
                row.store, row.folder, row.year, row.count
            );
        }
    }
    for unit in &report.skipped {
        let _ = writeln!(out, "skipped {} > {}: {}", unit.store, unit.folder, unit.reason);
    }
    if report.cancelled {
        out.push_str("scan cancelled; counts cover the part that ran\n");
    }
    out
}

fn render_move(outcome: &MoveOutcome) -> String {
    let mut out = String::new();
    let verb = if outcome.dry_run { "matched" } else { "moved" };
    let _ = writeln!(
        out,
        "move {} -> {} for {}{}",
        outcome.source,
        outcome.destination,
        outcome.year,
        if outcome.dry_run { " (dry run)" } else { "" }
    );
    let _ = writeln!(
        out,
        "  {:<10}  {} {verb}, {} failed",
        CANONICAL_FOLDERS[0], outcome.inbox.moved, outcome.inbox.failed
    );
    let _ = writeln!(
        out,
        "  {:<10}  {} {verb}, {} failed",
        CANONICAL_FOLDERS[1], outcome.sent.moved, outcome.sent.failed
    );
    if outcome.cancelled {
        out.push_str("move cancelled; counts cover the part that ran\n");
    }
    out
}

fn render_provision(report: &ProvisionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "provision for {}{}",
        report.account,
        if report.dry_run { " (dry run)" } else { "" }
    );
    if report.provisions.is_empty() {
        out.push_str("  every needed year already has an archive\n");
    }
    for provision in &report.provisions {
        let status = match &provision.outcome {
            YearOutcome::WouldCreate => "would create".to_string(),
            YearOutcome::Created => "created".to_string(),
            YearOutcome::Failed { reason } => format!("failed: {reason}"),
        };
        let _ = writeln!(out, "  {}  {}  {status}", provision.year, provision.store_name);
    }
    if report.cancelled {
        out.push_str("provisioning cancelled; later years were not attempted\n");
    }
    out
}

const fn toggle_word(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
