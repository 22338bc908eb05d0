//! Command manifests: JSON files describing shell-backed commands.
//!
//! A manifest is an array of objects. Each object uses the descriptor
//! fields (`name`, `description`, `category`, `keywords`, `icon`, `file`)
//! plus:
//!
//! - `run`: shell command executed by the action (required to be indexed)
//! - `enabledIf`: optional shell command; exit status 0 means enabled
//!
//! ```json
//! [
//!   {"name": "Open Downloads", "keywords": ["folder"], "run": "open ~/Downloads"},
//!   {"name": "Push", "category": "Git", "run": "git push", "enabledIf": "git rev-parse"}
//! ]
//! ```

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::catalog::{Action, CommandState, RawDescriptor, Validation};

/// Runs a command line through `sh -c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAction {
    command: String,
}

impl ShellAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Action for ShellAction {
    fn perform(&self) -> Result<bool> {
        debug!(command = %self.command, "Running shell action");
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("Failed to spawn shell for '{}'", self.command))?;
        Ok(status.success())
    }
}

/// Enabled when a command line exits with status 0, grayed otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellValidation {
    command: String,
}

impl ShellValidation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Validation for ShellValidation {
    fn check(&self) -> Result<CommandState> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to spawn shell for '{}'", self.command))?;
        Ok(if status.success() {
            CommandState::Enabled
        } else {
            CommandState::Grayed
        })
    }
}

fn optional_command(item: &Value, key: &str) -> Result<Option<String>> {
    match item.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(Value::String(_)) => bail!("'{}' must not be empty", key),
        Some(_) => bail!("'{}' must be a string", key),
    }
}

/// Parse manifest JSON. Entries without `file` get `origin` as their
/// file origin.
pub fn parse_manifest(content: &str, origin: &Path) -> Result<Vec<RawDescriptor>> {
    let value: Value = serde_json::from_str(content).context("Manifest is not valid JSON")?;
    let Some(items) = value.as_array() else {
        bail!("Manifest must be a JSON array of commands");
    };

    let mut descriptors = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let mut raw = RawDescriptor::from_value(item)
            .with_context(|| format!("Invalid command at index {}", position))?;

        if let Some(run) = optional_command(item, "run")
            .with_context(|| format!("Invalid command at index {}", position))?
        {
            let action: Arc<dyn Action> = Arc::new(ShellAction::new(run));
            raw.action = Some(action);
        }
        if let Some(check) = optional_command(item, "enabledIf")
            .with_context(|| format!("Invalid command at index {}", position))?
        {
            let validation: Arc<dyn Validation> = Arc::new(ShellValidation::new(check));
            raw.validation = Some(validation);
        }
        if raw.file_origin.is_none() {
            raw.file_origin = Some(origin.display().to_string());
        }
        descriptors.push(raw);
    }
    Ok(descriptors)
}

/// Read and parse a manifest file.
#[instrument(name = "load_manifest")]
pub fn load_manifest(path: &Path) -> Result<Vec<RawDescriptor>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let descriptors = parse_manifest(&content, path)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
    info!(count = descriptors.len(), "Loaded manifest");
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogIndex;
    use std::io::Write;

    #[test]
    fn test_parse_manifest() {
        let json = r#"[
            {"name": "Say hi", "keywords": ["greet"], "run": "true"},
            {"name": "No action"}
        ]"#;
        let descriptors = parse_manifest(json, Path::new("/tmp/commands.json")).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[0].action.is_some());
        assert!(descriptors[1].action.is_none());
        assert_eq!(
            descriptors[0].file_origin.as_deref(),
            Some("/tmp/commands.json")
        );
    }

    #[test]
    fn test_parse_manifest_rejects_bad_shapes() {
        let origin = Path::new("m.json");
        assert!(parse_manifest(r#"{"name": "x"}"#, origin).is_err());
        assert!(parse_manifest(r#"[{"name": "x", "run": 1}]"#, origin).is_err());
        assert!(parse_manifest(r#"[{"name": 1, "run": "true"}]"#, origin).is_err());
        assert!(parse_manifest(r#"[{"name": "x", "run": "  "}]"#, origin).is_err());
    }

    #[test]
    fn test_manifest_commands_run_through_index() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "Succeed", "icon": "ok.png", "run": "exit 0"}},
                {{"name": "Fail", "icon": "fail.png", "run": "exit 3"}},
                {{"name": "Gated", "icon": "gate.png", "run": "true", "enabledIf": "false"}}
            ]"#
        )
        .unwrap();

        let mut index = CatalogIndex::default();
        for raw in load_manifest(file.path()).unwrap() {
            assert!(index.register(raw).unwrap());
        }

        let succeed = index.query("Succeed", 1)[0].id;
        let fail = index.query("Fail", 1)[0].id;
        assert!(index.execute(&succeed));
        assert!(!index.execute(&fail));

        let gated = index.query("Gated", 1);
        assert_eq!(gated.len(), 1);
        assert!(!gated[0].enabled);
    }
}
