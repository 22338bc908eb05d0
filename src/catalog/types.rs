//! Catalog type definitions
//!
//! Command ids, the canonical descriptor, the registration shapes accepted at
//! the `add` boundary, and the owned records handed back to callers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::IndexError;
use crate::gateway::{Action, Validation};

// ============================================
// COMMAND ID
// ============================================

/// Content fingerprint of a command (64 bits, shown as 16 hex digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    pub(crate) fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_be_bytes()))
    }
}

impl FromStr for CommandId {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 8];
        if s.len() != 16 {
            return Err(IndexError::invalid("id", "must be 16 hexadecimal digits"));
        }
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| IndexError::invalid("id", format!("is not a fingerprint ({})", e)))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl Serialize for CommandId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CommandId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// DESCRIPTOR
// ============================================

/// The indexed record for one command.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub id: CommandId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    /// Icon path
    pub icon: Option<String>,
    /// Where the command was registered from (best effort)
    pub file_origin: Option<String>,
    pub action: Arc<dyn Action>,
    /// Absent means always enabled
    pub validation: Option<Arc<dyn Validation>>,
    pub usage_count: u64,
    /// Score from the most recent query that evaluated this entry
    pub last_score: f64,
    /// Enabled state seen by the most recent query; None when the
    /// validation callback failed
    pub last_enabled: Option<bool>,
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("description", &self.description)
            .field("category", &self.category)
            .field("keywords", &self.keywords)
            .field("icon", &self.icon)
            .field("file_origin", &self.file_origin)
            .field("has_validation", &self.validation.is_some())
            .field("usage_count", &self.usage_count)
            .field("last_score", &self.last_score)
            .field("last_enabled", &self.last_enabled)
            .finish_non_exhaustive()
    }
}

impl CommandDescriptor {
    pub fn has_icon(&self) -> bool {
        self.icon.as_deref().is_some_and(|icon| !icon.is_empty())
    }

    pub(crate) fn to_result(&self) -> QueryResult {
        QueryResult {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            keywords: self.keywords.clone(),
            icon: self.icon.clone(),
            enabled: self.last_enabled.unwrap_or(false),
            score: self.last_score,
        }
    }
}

// ============================================
// REGISTRATION
// ============================================

/// A command object owned by the host application.
///
/// Every getter is optional. Values found here fill the gaps of a raw
/// registration; a getter that panics makes the registration fail softly.
pub trait NativeCommand {
    fn menu_text(&self) -> Option<String> {
        None
    }
    fn tooltip(&self) -> Option<String> {
        None
    }
    fn status_bar_text(&self) -> Option<String> {
        None
    }
    fn large_icon(&self) -> Option<String> {
        None
    }
    fn small_icon(&self) -> Option<String> {
        None
    }
    /// Menu path including the item itself, e.g. `["Draw", "Shapes", "Circle"]`
    fn menu_path(&self) -> Option<Vec<String>> {
        None
    }
    fn toolbar_name(&self) -> Option<String> {
        None
    }
    fn file_origin(&self) -> Option<String> {
        None
    }
    fn action(&self) -> Option<Arc<dyn Action>> {
        None
    }
    fn validation(&self) -> Option<Arc<dyn Validation>> {
        None
    }
}

/// Loosely shaped command data. Used both as a registration and as the
/// override set applied on top of one.
#[derive(Clone, Default)]
pub struct RawDescriptor {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub icon: Option<String>,
    pub file_origin: Option<String>,
    pub action: Option<Arc<dyn Action>>,
    pub validation: Option<Arc<dyn Validation>>,
    /// Host object used to default the fields above
    pub command: Option<Arc<dyn NativeCommand>>,
}

impl fmt::Debug for RawDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("category", &self.category)
            .field("keywords", &self.keywords)
            .field("icon", &self.icon)
            .field("file_origin", &self.file_origin)
            .field("has_action", &self.action.is_some())
            .field("has_validation", &self.validation.is_some())
            .field("has_command", &self.command.is_some())
            .finish()
    }
}

impl RawDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn file_origin(mut self, file_origin: impl Into<String>) -> Self {
        self.file_origin = Some(file_origin.into());
        self
    }

    pub fn action<A: Action + 'static>(mut self, action: A) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn validation<V: Validation + 'static>(mut self, validation: V) -> Self {
        self.validation = Some(Arc::new(validation));
        self
    }

    pub fn command(mut self, command: Arc<dyn NativeCommand>) -> Self {
        self.command = Some(command);
        self
    }

    /// Build from untyped JSON.
    ///
    /// The value must be an object. Known text fields must be strings (or
    /// null), `keywords` an array of strings. `id` is ignored since ids are
    /// always recomputed; unknown keys are ignored. Callbacks cannot be
    /// expressed in JSON and are attached by the caller.
    pub fn from_value(value: &Value) -> crate::error::Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| IndexError::invalid("descriptor", "must be a JSON object"))?;

        let text = |key: &str| -> crate::error::Result<Option<String>> {
            match object.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(IndexError::invalid(key, "must be a string")),
            }
        };

        let keywords = match object.get("keywords") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| IndexError::invalid("keywords", "entries must be strings"))
                    })
                    .collect::<crate::error::Result<Vec<_>>>()?,
            ),
            Some(_) => return Err(IndexError::invalid("keywords", "must be an array of strings")),
        };

        let file_origin = match text("fileOrigin")? {
            Some(origin) => Some(origin),
            None => text("file")?,
        };

        Ok(Self {
            name: text("name")?,
            description: text("description")?,
            category: text("category")?,
            keywords,
            icon: text("icon")?,
            file_origin,
            ..Default::default()
        })
    }
}

/// What a collaborator hands to `CatalogIndex::add`.
#[derive(Clone)]
pub enum Registration {
    Native(Arc<dyn NativeCommand>),
    Raw(RawDescriptor),
}

impl From<RawDescriptor> for Registration {
    fn from(raw: RawDescriptor) -> Self {
        Registration::Raw(raw)
    }
}

impl From<Arc<dyn NativeCommand>> for Registration {
    fn from(command: Arc<dyn NativeCommand>) -> Self {
        Registration::Native(command)
    }
}

impl Registration {
    pub(crate) fn into_raw(self) -> RawDescriptor {
        match self {
            Registration::Native(command) => RawDescriptor {
                command: Some(command),
                ..Default::default()
            },
            Registration::Raw(raw) => raw,
        }
    }
}

// ============================================
// OUTPUT RECORDS
// ============================================

/// Owned snapshot of one ranked entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
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
    pub enabled: bool,
    pub score: f64,
}

/// A registration that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingRegistration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reason: String,
}
