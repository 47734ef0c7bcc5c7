//! Run log directories.
//!
//! A logged run writes one directory per run:
//! - `meta.json` for run metadata
//! - `events.jsonl` for structured lifecycle events
//! - `report.json` for the final [`RunReport`]

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use knownfail_error::{KnownFailError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::report::{CaseReport, CaseStatus, RunReport};

/// Version of the run log schema.
pub const LOG_SCHEMA_VERSION: u32 = 1;

/// Files that must be present in every finished run log.
pub const REQUIRED_LOG_FILES: [&str; 3] = ["meta.json", "events.jsonl", "report.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventKind {
    RunStart,
    CaseStart,
    Iteration,
    CaseEnd,
    RunEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub run_id: String,
    pub harness_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub kind: LifecycleEventKind,
    pub status: Option<CaseStatus>,
    pub step: u64,
    pub message: String,
    pub payload: BTreeMap<String, Value>,
}

#[derive(Debug)]
pub struct RunLog {
    root: PathBuf,
    events_file: File,
    next_step: u64,
}

impl RunLog {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn emit_event(
        &mut self,
        kind: LifecycleEventKind,
        status: Option<CaseStatus>,
        message: impl Into<String>,
        payload: BTreeMap<String, Value>,
    ) -> Result<()> {
        let event = RunEvent {
            kind,
            status,
            step: self.next_step,
            message: message.into(),
            payload,
        };
        self.next_step = self.next_step.saturating_add(1);
        self.write_event_line(&event)
    }

    /// Record one finished case: start, one event per iteration, end.
    pub fn record_case(&mut self, report: &CaseReport) -> Result<()> {
        let qualified = format!("{}::{}", report.suite, report.case);

        let mut payload = BTreeMap::new();
        payload.insert("suite".to_owned(), Value::String(report.suite.clone()));
        payload.insert("case".to_owned(), Value::String(report.case.clone()));
        self.emit_event(LifecycleEventKind::CaseStart, None, qualified.clone(), payload)?;

        for iteration in &report.iterations {
            let mut payload = BTreeMap::new();
            payload.insert("iteration".to_owned(), Value::String(iteration.name.clone()));
            if let Some(message) = &iteration.message {
                payload.insert("detail".to_owned(), Value::String(message.clone()));
            }
            self.emit_event(
                LifecycleEventKind::Iteration,
                Some(iteration.status),
                format!("{qualified}[{}]", iteration.name),
                payload,
            )?;
        }

        let mut payload = BTreeMap::new();
        if let Some(message) = &report.message {
            payload.insert("detail".to_owned(), Value::String(message.clone()));
        }
        self.emit_event(
            LifecycleEventKind::CaseEnd,
            Some(report.status),
            qualified,
            payload,
        )
    }

    pub fn finish(mut self, report: &RunReport) -> Result<PathBuf> {
        write_json_file(self.root.join("report.json"), report)?;

        let status = if report.is_success() {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        let mut payload = BTreeMap::new();
        for kind in [CaseStatus::Passed, CaseStatus::Failed, CaseStatus::Skipped] {
            payload.insert(kind.as_str().to_owned(), Value::from(report.count(kind)));
        }
        let event = RunEvent {
            kind: LifecycleEventKind::RunEnd,
            status: Some(status),
            step: self.next_step,
            message: "run_end".to_owned(),
            payload,
        };
        self.write_event_line(&event)?;
        self.events_file.flush()?;
        info!(
            target: "knownfail.runner",
            root = %self.root.display(),
            status = status.as_str(),
            "run log finalized"
        );
        Ok(self.root)
    }

    fn write_event_line(&mut self, event: &RunEvent) -> Result<()> {
        let encoded = serde_json::to_string(event)
            .map_err(|err| internal_error(format!("failed to serialize run event: {err}")))?;
        writeln!(self.events_file, "{encoded}")?;
        self.events_file.flush()?;
        Ok(())
    }
}

pub fn init_run_log(base_dir: &Path, run_id: &str) -> Result<RunLog> {
    if run_id.is_empty() {
        return Err(internal_error("run_id must be non-empty"));
    }

    let root = base_dir.join(sanitize_segment(run_id));
    fs::create_dir_all(&root)?;

    let meta = RunMeta {
        schema_version: LOG_SCHEMA_VERSION,
        run_id: run_id.to_owned(),
        harness_version: env!("CARGO_PKG_VERSION").to_owned(),
    };
    write_json_file(root.join("meta.json"), &meta)?;

    let events_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(root.join("events.jsonl"))?;

    let mut log = RunLog {
        root,
        events_file,
        next_step: 0,
    };
    log.emit_event(
        LifecycleEventKind::RunStart,
        None,
        "run_start",
        BTreeMap::new(),
    )?;

    info!(
        target: "knownfail.runner",
        run_id = run_id,
        root = %log.root.display(),
        "run log initialized"
    );

    Ok(log)
}

pub fn validate_required_files(log_root: &Path) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_LOG_FILES
        .iter()
        .copied()
        .filter(|name| !log_root.join(name).is_file())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    error!(
        target: "knownfail.runner",
        log = %log_root.display(),
        missing_count = missing.len(),
        "missing required run log files"
    );
    Err(internal_error(format!(
        "missing required run log files: {}",
        missing.join(", ")
    )))
}

pub fn validate_run_meta(log_root: &Path) -> Result<RunMeta> {
    let bytes = fs::read(log_root.join("meta.json"))?;
    let meta: RunMeta = serde_json::from_slice(&bytes)
        .map_err(|err| internal_error(format!("meta.json parse failure: {err}")))?;

    if meta.schema_version != LOG_SCHEMA_VERSION {
        warn!(
            target: "knownfail.runner",
            expected = LOG_SCHEMA_VERSION,
            found = meta.schema_version,
            "run log schema version mismatch"
        );
        return Err(internal_error(format!(
            "unsupported schema version: expected {LOG_SCHEMA_VERSION}, got {}",
            meta.schema_version
        )));
    }

    if meta.run_id.is_empty() {
        return Err(internal_error("meta.json must include a non-empty run_id"));
    }

    Ok(meta)
}

pub fn read_events(log_root: &Path) -> Result<Vec<RunEvent>> {
    let file = File::open(log_root.join("events.jsonl"))?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            return Err(internal_error(format!(
                "events.jsonl has empty line at {}",
                line_no + 1
            )));
        }
        let event: RunEvent = serde_json::from_str(&line).map_err(|err| {
            internal_error(format!(
                "events.jsonl parse failure at line {}: {err}",
                line_no + 1
            ))
        })?;
        events.push(event);
    }

    if events.is_empty() {
        return Err(internal_error("events.jsonl must contain at least one event"));
    }

    Ok(events)
}

pub fn read_report(log_root: &Path) -> Result<RunReport> {
    let json = fs::read_to_string(log_root.join("report.json"))?;
    RunReport::from_json(&json)
        .map_err(|err| internal_error(format!("report.json parse failure: {err}")))
}

pub fn validate_run_log(log_root: &Path) -> Result<()> {
    validate_required_files(log_root)?;
    let _meta = validate_run_meta(log_root)?;
    let events = read_events(log_root)?;

    if events.first().map(|event| event.kind) != Some(LifecycleEventKind::RunStart) {
        return Err(internal_error("events.jsonl must start with a run_start event"));
    }
    if events.last().map(|event| event.kind) != Some(LifecycleEventKind::RunEnd) {
        return Err(internal_error("events.jsonl must end with a run_end event"));
    }

    let starts = events
        .iter()
        .filter(|event| event.kind == LifecycleEventKind::CaseStart)
        .count();
    let ends = events
        .iter()
        .filter(|event| event.kind == LifecycleEventKind::CaseEnd)
        .count();
    if starts != ends {
        return Err(internal_error(format!(
            "unbalanced case events: {starts} case_start vs {ends} case_end"
        )));
    }

    Ok(())
}

fn write_json_file<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| internal_error(format!("failed to serialize JSON: {err}")))?;
    fs::write(path, bytes)?;
    Ok(())
}

fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

fn internal_error(message: impl Into<String>) -> KnownFailError {
    KnownFailError::Internal(message.into())
}
