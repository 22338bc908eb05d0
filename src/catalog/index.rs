//! The catalog index: owns every command descriptor and answers queries.

use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, RankingConfig};
use crate::error::{panic_message, IndexError, Result};
use crate::gateway::ExecutionGateway;
use crate::scorer::Scorer;

use super::fingerprint::fingerprint;
use super::normalize::{normalize, validate_shapes, Normalized, NormalizedCommand};
use super::search::{run_query, RankContext};
use super::types::{
    CommandDescriptor, CommandId, MissingRegistration, QueryResult, RawDescriptor, Registration,
};

/// In-memory command catalog.
///
/// Entries are keyed by content fingerprint and live as long as the index.
/// Callers only ever receive owned copies.
pub struct CatalogIndex {
    entries: HashMap<CommandId, CommandDescriptor>,
    missing: Vec<MissingRegistration>,
    /// Usage loaded for commands that have not been registered yet
    pending_usage: HashMap<CommandId, u64>,
    /// Most recent successful executions, newest first
    recent: VecDeque<CommandId>,
    ranking: RankingConfig,
    scorer: Scorer,
    gateway: ExecutionGateway,
    max_results: usize,
    history_max_length: usize,
}

impl Default for CatalogIndex {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl CatalogIndex {
    pub fn new(config: &Config) -> Self {
        let ranking = config.get_ranking();
        let scorer = Scorer::new(ranking.effective_fuzziness());
        Self {
            entries: HashMap::new(),
            missing: Vec::new(),
            pending_usage: HashMap::new(),
            recent: VecDeque::new(),
            ranking,
            scorer,
            gateway: ExecutionGateway::new(config.get_slow_callback()),
            max_results: config.get_query().max_results,
            history_max_length: config.get_tracking().history_max_length,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Default result cap used by [`CatalogIndex::query_default`].
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Register a command.
    ///
    /// Returns `Ok(true)` when the command was inserted or merged into an
    /// entry with the same fingerprint, `Ok(false)` when it was rejected into
    /// [`CatalogIndex::missing`].
    pub fn add(
        &mut self,
        registration: impl Into<Registration>,
        overrides: RawDescriptor,
    ) -> Result<bool> {
        let command = match normalize(registration.into(), overrides)? {
            Normalized::Ready(command) => command,
            Normalized::Missing(missing) => {
                warn!(
                    name = ?missing.name,
                    reason = %missing.reason,
                    "Registration rejected"
                );
                self.missing.push(missing);
                return Ok(false);
            }
        };

        let id = fingerprint(
            &command.name,
            command.description.as_deref(),
            command.icon.as_deref(),
        );

        match self.entries.get_mut(&id) {
            Some(existing) => {
                merge_into(existing, command);
                debug!(id = %id, name = %existing.name, "Merged registration into existing entry");
            }
            None => {
                let usage_count = self.pending_usage.remove(&id).unwrap_or(0);
                debug!(id = %id, name = %command.name, usage_count, "Indexed command");
                self.entries.insert(id, descriptor_from(id, command, usage_count));
            }
        }
        Ok(true)
    }

    /// Register a command without overrides.
    pub fn register(&mut self, registration: impl Into<Registration>) -> Result<bool> {
        self.add(registration, RawDescriptor::default())
    }

    /// Apply overrides to an existing entry in place. The id is kept even
    /// when fingerprinted fields change. Returns `Ok(false)` for unknown ids.
    pub fn update(&mut self, id: &CommandId, overrides: RawDescriptor) -> Result<bool> {
        validate_shapes(&overrides)?;
        if overrides
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(IndexError::invalid("name", "must not be blank"));
        }

        let Some(entry) = self.entries.get_mut(id) else {
            debug!(id = %id, "Update requested for unknown command");
            return Ok(false);
        };

        if let Some(name) = overrides.name {
            entry.name = name.trim().to_string();
        }
        if let Some(description) = overrides.description {
            entry.description = Some(description);
        }
        if let Some(category) = overrides.category {
            entry.category = Some(category);
        }
        if let Some(keywords) = overrides.keywords {
            entry.keywords = keywords;
        }
        if let Some(icon) = overrides.icon {
            entry.icon = Some(icon);
        }
        if let Some(file_origin) = overrides.file_origin {
            entry.file_origin = Some(file_origin);
        }
        if let Some(action) = overrides.action {
            entry.action = action;
        }
        if let Some(validation) = overrides.validation {
            entry.validation = Some(validation);
        }
        Ok(true)
    }

    pub fn get_by_id(&self, id: &CommandId) -> Option<CommandDescriptor> {
        self.entries.get(id).cloned()
    }

    /// Every entry, sorted by name.
    pub fn get_all(&self) -> Vec<CommandDescriptor> {
        let mut all: Vec<CommandDescriptor> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Registrations that could not be indexed.
    pub fn missing(&self) -> &[MissingRegistration] {
        &self.missing
    }

    /// Run the command's action. Usage is counted only when it succeeds.
    pub fn execute(&mut self, id: &CommandId) -> bool {
        let Some(entry) = self.entries.get(id) else {
            warn!(id = %id, "Execute requested for unknown command");
            return false;
        };
        let action = Arc::clone(&entry.action);
        let name = entry.name.clone();

        let success = self.gateway.invoke(&name, action.as_ref());
        if success {
            if let Some(entry) = self.entries.get_mut(id) {
                entry.usage_count = entry.usage_count.saturating_add(1);
            }
            self.remember(*id);
        }
        info!(
            event_type = "command_event",
            id = %id,
            command = %name,
            success = success,
            "Executed command"
        );
        success
    }

    fn remember(&mut self, id: CommandId) {
        self.recent.retain(|existing| *existing != id);
        self.recent.push_front(id);
        self.recent.truncate(self.history_max_length);
    }

    /// Ids of the most recently executed commands, newest first.
    pub fn recent(&self) -> Vec<CommandId> {
        self.recent.iter().copied().collect()
    }

    /// Replace the recent history, e.g. with one saved by a previous session.
    pub fn restore_recent(&mut self, ids: Vec<CommandId>) {
        self.recent = ids.into_iter().collect();
        self.recent.truncate(self.history_max_length);
    }

    /// Rank the catalog against `text` and return at most `max_results`
    /// entries, best first. A candidate that panics while scoring is skipped;
    /// a panic anywhere else in the query yields an empty list.
    pub fn query(&mut self, text: &str, max_results: usize) -> Vec<QueryResult> {
        let ctx = RankContext {
            ranking: &self.ranking,
            scorer: self.scorer,
            gateway: &self.gateway,
        };
        let entries = &mut self.entries;

        match catch_unwind(AssertUnwindSafe(|| run_query(entries, text, max_results, &ctx))) {
            Ok(results) => results,
            Err(payload) => {
                error!(
                    query = text,
                    panic = %panic_message(payload.as_ref()),
                    "Query failed, returning no results"
                );
                Vec::new()
            }
        }
    }

    /// [`CatalogIndex::query`] with the configured result cap.
    pub fn query_default(&mut self, text: &str) -> Vec<QueryResult> {
        self.query(text, self.max_results)
    }

    /// Add imported usage counts to the in-memory ones. Counts for unknown
    /// ids are kept and applied when that command is registered.
    #[instrument(skip_all, fields(count = counts.len()))]
    pub fn load_tracking(&mut self, counts: HashMap<CommandId, u64>) {
        let mut applied = 0usize;
        for (id, count) in counts {
            match self.entries.get_mut(&id) {
                Some(entry) => {
                    entry.usage_count = entry.usage_count.saturating_add(count);
                    applied += 1;
                }
                None => {
                    let pending = self.pending_usage.entry(id).or_insert(0);
                    *pending = pending.saturating_add(count);
                }
            }
        }
        info!(applied, pending = self.pending_usage.len(), "Loaded usage tracking");
    }

    /// Current usage counts, including counts for commands not registered
    /// in this session.
    pub fn tracking(&self) -> HashMap<CommandId, u64> {
        let mut counts = self.pending_usage.clone();
        for entry in self.entries.values().filter(|e| e.usage_count > 0) {
            counts.insert(entry.id, entry.usage_count);
        }
        counts
    }
}

fn descriptor_from(id: CommandId, command: NormalizedCommand, usage_count: u64) -> CommandDescriptor {
    CommandDescriptor {
        id,
        name: command.name,
        description: command.description,
        category: command.category,
        keywords: command.keywords,
        icon: command.icon,
        file_origin: command.file_origin,
        action: command.action,
        validation: command.validation,
        usage_count,
        last_score: 0.0,
        last_enabled: None,
    }
}

/// Present incoming values replace existing ones; usage is untouched.
fn merge_into(existing: &mut CommandDescriptor, incoming: NormalizedCommand) {
    existing.name = incoming.name;
    if incoming.description.is_some() {
        existing.description = incoming.description;
    }
    if incoming.category.is_some() {
        existing.category = incoming.category;
    }
    if !incoming.keywords.is_empty() {
        existing.keywords = incoming.keywords;
    }
    if incoming.icon.is_some() {
        existing.icon = incoming.icon;
    }
    if incoming.file_origin.is_some() {
        existing.file_origin = incoming.file_origin;
    }
    existing.action = incoming.action;
    if incoming.validation.is_some() {
        existing.validation = incoming.validation;
    }
}
