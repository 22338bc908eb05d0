//! Request and response messages of the JSONL protocol.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CommandDescriptor, CommandId, MissingRegistration, QueryResult};
use crate::error::{ErrorSeverity, IndexError};

/// A request from the presentation layer, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Ranked search
    #[serde(rename_all = "camelCase")]
    LookUp {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_results: Option<u64>,
    },
    /// Run a command
    Execute { id: CommandId },
    /// Fetch specific entries by id
    GetEntries { ids: Vec<CommandId> },
    /// Fetch every entry, sorted by name
    GetAll,
    /// Merge usage counts from a previous session
    LoadTracking { counts: HashMap<CommandId, u64> },
    /// Export usage counts
    Tracking,
    /// Most recently executed commands
    Recent,
    /// Registrations that could not be indexed
    Missing,
}

impl Request {
    pub fn look_up(text: impl Into<String>, max_results: Option<u64>) -> Self {
        Request::LookUp {
            text: text.into(),
            max_results,
        }
    }

    pub fn execute(id: CommandId) -> Self {
        Request::Execute { id }
    }
}

/// Serializable snapshot of a catalog entry (callbacks omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub id: CommandId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_origin: Option<String>,
    pub usage_count: u64,
    pub has_validation: bool,
}

impl From<&CommandDescriptor> for EntryInfo {
    fn from(d: &CommandDescriptor) -> Self {
        EntryInfo {
            id: d.id,
            name: d.name.clone(),
            description: d.description.clone(),
            category: d.category.clone(),
            keywords: d.keywords.clone(),
            icon: d.icon.clone(),
            file_origin: d.file_origin.clone(),
            usage_count: d.usage_count,
            has_validation: d.validation.is_some(),
        }
    }
}

/// A response to the presentation layer, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Results {
        results: Vec<QueryResult>,
    },
    Executed {
        id: CommandId,
        success: bool,
    },
    /// Found entries; ids that are unknown are listed separately
    #[serde(rename_all = "camelCase")]
    Entries {
        entries: Vec<EntryInfo>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        not_found: Vec<CommandId>,
    },
    TrackingLoaded {
        count: usize,
    },
    Tracking {
        counts: HashMap<CommandId, u64>,
    },
    Recent {
        ids: Vec<CommandId>,
    },
    Missing {
        missing: Vec<MissingRegistration>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        argument: Option<String>,
        severity: String,
    },
}

impl Response {
    pub fn error(err: &IndexError) -> Self {
        let argument = match err {
            IndexError::InvalidArgument { argument, .. } => Some(argument.clone()),
            _ => None,
        };
        let severity = match err.severity() {
            ErrorSeverity::Info => "info",
            ErrorSeverity::Warning => "warning",
            ErrorSeverity::Error => "error",
            ErrorSeverity::Critical => "critical",
        };
        Response::Error {
            message: err.user_message(),
            argument,
            severity: severity.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
