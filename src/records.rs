//! Question/answer records: search filter, pagination and JSON import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::matcher;

/// Records shown before the first "load more".
pub const DISPLAY_LIMIT: usize = 30;
/// How many more records each "load more" reveals.
pub const LOAD_MORE_STEP: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub unverified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl QaRecord {
    /// A crowd-submitted record, pending verification.
    pub fn submitted(question: &str, answer: &str) -> Result<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() {
            return Err(AppError::EmptyField("question"));
        }
        if answer.is_empty() {
            return Err(AppError::EmptyField("answer"));
        }
        Ok(Self {
            question: question.to_string(),
            answer: answer.to_string(),
            unverified: true,
            added_at: Some(Utc::now()),
        })
    }

    /// Same question and answer text.
    pub fn same_pair(&self, question: &str, answer: &str) -> bool {
        self.question == question && self.answer == answer
    }

    pub fn matches(&self, query: &str, min_similarity: f64) -> bool {
        matcher::matches(&self.question, query, min_similarity)
            || matcher::matches(&self.answer, query, min_similarity)
    }
}

/// Keep records whose question or answer matches `query`, in input order.
pub fn filter_records<'a, I>(records: I, query: &str, min_similarity: f64) -> Vec<&'a QaRecord>
where
    I: IntoIterator<Item = &'a QaRecord>,
{
    records
        .into_iter()
        .filter(|r| r.matches(query, min_similarity))
        .collect()
}

/// A prefix of a result list.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub has_more: bool,
}

pub fn paginate<T>(items: Vec<T>, limit: usize) -> Page<T> {
    let total = items.len();
    let items: Vec<T> = items.into_iter().take(limit).collect();
    Page {
        has_more: total > items.len(),
        items,
        total,
    }
}

/// Display limit after `load_more` clicks.
pub fn display_limit(load_more: usize) -> usize {
    DISPLAY_LIMIT.saturating_add(load_more.saturating_mul(LOAD_MORE_STEP))
}

#[derive(Deserialize)]
struct ImportItem {
    #[serde(default)]
    question: String,
    #[serde(default)]
    answer: String,
}

/// Parse an import file: `[{"question": "...", "answer": "..."}, ...]`.
///
/// Imported records are verified and stamped with the import time.
pub fn parse_import(json: &str) -> Result<Vec<QaRecord>> {
    let items: Vec<ImportItem> =
        serde_json::from_str(json).map_err(|e| AppError::InvalidImport(e.to_string()))?;

    let now = Utc::now();
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if item.question.is_empty() || item.answer.is_empty() {
                return Err(AppError::InvalidImport(format!(
                    "item {i} needs a non-empty question and answer"
                )));
            }
            Ok(QaRecord {
                question: item.question,
                answer: item.answer,
                unverified: false,
                added_at: Some(now),
            })
        })
        .collect()
}
