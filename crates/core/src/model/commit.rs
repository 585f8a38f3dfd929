use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Person;

/// What a commit did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Add,
    Delete,
    Modify,
    Copy,
    Move,
    Replace,
    Unknown,
}

impl FileAction {
    /// Decode the single-letter action code stored by the SCM miner.
    pub fn from_code(code: &str) -> Self {
        match code {
            "A" => FileAction::Add,
            "D" => FileAction::Delete,
            "M" => FileAction::Modify,
            "C" => FileAction::Copy,
            "V" => FileAction::Move,
            "R" => FileAction::Replace,
            _ => FileAction::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub header: String,
    pub start_line: i64,
    pub end_line: i64,
}

/// A source module (class, compilation unit) reported by the metrics extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub start_line: i64,
    pub end_line: i64,
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path as of the commit; missing when the miner has no link for it.
    pub path: Option<String>,
    pub branch: Option<String>,
    pub action: FileAction,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Store-level commit id.
    pub id: i64,
    pub repository: Option<String>,
    pub revision: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub author: Option<Person>,
    pub committer: Option<Person>,
    pub files: Vec<FileChange>,
}
