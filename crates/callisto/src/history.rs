/*
 * history.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::MutexGuard;

use regex::Regex;

use crate::wire::exception::Exception;
use crate::wire::history_reply::HistoryEntry;
use crate::wire::history_reply::HistoryReply;
use crate::wire::history_request::HistAccessType;
use crate::wire::history_request::HistoryRequest;
use crate::wire::jupyter_message::Status;

const DEFAULT_TAIL: usize = 10;
const DEFAULT_RANGE_START: u32 = 1;
const DEFAULT_RANGE_STOP: u32 = 10;

/// Session number recorded with entries; 0 stands for the current session
const CURRENT_SESSION: i64 = 0;

/// In-memory record of the inputs executed in this session
#[derive(Default)]
pub struct History {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn store(&self, line: u32, input: &str) {
        self.lock()
            .push(HistoryEntry(CURRENT_SESSION, line, String::from(input)));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<HistoryEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        entries[skip..].to_vec()
    }

    /// Entries with line numbers in `start..stop`.
    pub fn range(&self, start: u32, stop: u32) -> Result<Vec<HistoryEntry>, Exception> {
        if start > stop {
            return Err(history_error(format!(
                "Invalid history range: start ({start}) is after stop ({stop})"
            )));
        }

        Ok(self
            .lock()
            .iter()
            .filter(|entry| entry.1 >= start && entry.1 < stop)
            .cloned()
            .collect())
    }

    /// The last `n` entries whose input matches the glob `pattern`, where
    /// `*` matches any run of characters and `?` a single one. With `unique`,
    /// only the most recent occurrence of each input is kept.
    pub fn search(
        &self,
        pattern: &str,
        n: usize,
        unique: bool,
    ) -> Result<Vec<HistoryEntry>, Exception> {
        let regex = glob_to_regex(pattern)?;
        let entries = self.lock();

        let mut seen = HashSet::new();
        let mut matches: Vec<HistoryEntry> = entries
            .iter()
            .rev()
            .filter(|entry| regex.is_match(&entry.2))
            .filter(|entry| !unique || seen.insert(entry.2.clone()))
            .take(n)
            .cloned()
            .collect();
        matches.reverse();
        Ok(matches)
    }

    /// Answers a `history_request`.
    pub fn process(&self, req: &HistoryRequest) -> Result<HistoryReply, Exception> {
        let history = match req.hist_access_type {
            HistAccessType::Tail => self.tail(req.n.unwrap_or(DEFAULT_TAIL)),
            HistAccessType::Range => {
                // Only the current session is kept in memory
                if req.session > CURRENT_SESSION {
                    Vec::new()
                } else {
                    self.range(
                        req.start.unwrap_or(DEFAULT_RANGE_START),
                        req.stop.unwrap_or(DEFAULT_RANGE_STOP),
                    )?
                }
            },
            HistAccessType::Search => self.search(
                req.pattern.as_deref().unwrap_or("*"),
                req.n.unwrap_or(DEFAULT_TAIL),
                req.unique,
            )?,
        };

        Ok(HistoryReply {
            status: Status::Ok,
            history,
        })
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, Exception> {
    let mut expr = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            ch => expr.push_str(&regex::escape(&ch.to_string())),
        }
    }
    expr.push('$');

    // Inputs often span several lines
    let expr = format!("(?s){expr}");
    Regex::new(&expr).map_err(|err| history_error(format!("Invalid search pattern: {err}")))
}

fn history_error(evalue: String) -> Exception {
    Exception {
        ename: String::from("HistoryError"),
        evalue,
        traceback: vec![],
    }
}
