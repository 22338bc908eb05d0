//! Turns a registration plus overrides into canonical command fields.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{panic_message, IndexError, Result};
use crate::gateway::{Action, Validation};

use super::types::{MissingRegistration, NativeCommand, RawDescriptor, Registration};

/// Separator used when a menu path becomes a category.
pub const MENU_PATH_SEPARATOR: &str = " › ";
/// Category for items whose menu path starts with an empty element.
pub const CONTEXT_MENU_CATEGORY: &str = "Context menu";

/// Canonical fields of a command that is ready to be indexed.
pub(crate) struct NormalizedCommand {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub keywords: Vec<String>,
    pub icon: Option<String>,
    pub file_origin: Option<String>,
    pub action: Arc<dyn Action>,
    pub validation: Option<Arc<dyn Validation>>,
}

pub(crate) enum Normalized {
    Ready(NormalizedCommand),
    Missing(MissingRegistration),
}

/// Overlay `overrides` on the registration, default the gaps from the host
/// command object, then validate.
///
/// Argument errors are returned. A registration without a name or action,
/// or whose host object panics while being read, becomes `Missing`.
pub(crate) fn normalize(registration: Registration, overrides: RawDescriptor) -> Result<Normalized> {
    let merged = overlay(registration.into_raw(), overrides);
    validate_shapes(&merged)?;

    let requested_name = merged.name.clone();
    let defaulted = match catch_unwind(AssertUnwindSafe(|| fill_from_command(merged))) {
        Ok(raw) => raw,
        Err(payload) => {
            return Ok(Normalized::Missing(MissingRegistration {
                name: requested_name,
                reason: format!("command object failed: {}", panic_message(payload.as_ref())),
            }))
        }
    };
    // Values coming from the host object are checked as well
    validate_shapes(&defaulted)?;

    let name = match clean(defaulted.name) {
        Some(name) => name,
        None => {
            return Ok(Normalized::Missing(MissingRegistration {
                name: None,
                reason: "missing name".to_string(),
            }))
        }
    };
    let action = match defaulted.action {
        Some(action) => action,
        None => {
            return Ok(Normalized::Missing(MissingRegistration {
                name: Some(name),
                reason: "missing action".to_string(),
            }))
        }
    };

    Ok(Normalized::Ready(NormalizedCommand {
        name,
        description: clean(defaulted.description),
        category: clean(defaulted.category),
        keywords: defaulted
            .keywords
            .unwrap_or_default()
            .into_iter()
            .map(|k| k.trim().to_string())
            .collect(),
        icon: clean(defaulted.icon),
        file_origin: clean(defaulted.file_origin),
        action,
        validation: defaulted.validation,
    }))
}

/// Present values in `top` replace those in `base`.
pub(crate) fn overlay(base: RawDescriptor, top: RawDescriptor) -> RawDescriptor {
    RawDescriptor {
        name: top.name.or(base.name),
        description: top.description.or(base.description),
        category: top.category.or(base.category),
        keywords: top.keywords.or(base.keywords),
        icon: top.icon.or(base.icon),
        file_origin: top.file_origin.or(base.file_origin),
        action: top.action.or(base.action),
        validation: top.validation.or(base.validation),
        command: top.command.or(base.command),
    }
}

/// Reject values no caller should ever send.
pub(crate) fn validate_shapes(raw: &RawDescriptor) -> Result<()> {
    if let Some(keywords) = &raw.keywords {
        if keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(IndexError::invalid("keywords", "entries must not be blank"));
        }
    }
    if raw.icon.as_deref().is_some_and(|icon| icon.contains('\0')) {
        return Err(IndexError::invalid("icon", "must not contain NUL bytes"));
    }
    if raw
        .file_origin
        .as_deref()
        .is_some_and(|origin| origin.contains('\0'))
    {
        return Err(IndexError::invalid("file_origin", "must not contain NUL bytes"));
    }
    Ok(())
}

fn fill_from_command(mut raw: RawDescriptor) -> RawDescriptor {
    let Some(command) = raw.command.clone() else {
        return raw;
    };

    if raw.name.is_none() {
        raw.name = command.menu_text();
    }
    if raw.description.is_none() {
        raw.description = command.tooltip().or_else(|| command.status_bar_text());
    }
    if raw.icon.is_none() {
        raw.icon = command.large_icon().or_else(|| command.small_icon());
    }
    if raw.category.is_none() {
        raw.category = category_for(command.as_ref());
    }
    if raw.file_origin.is_none() {
        raw.file_origin = command.file_origin();
    }
    if raw.action.is_none() {
        raw.action = command.action();
    }
    if raw.validation.is_none() {
        raw.validation = command.validation();
    }
    raw
}

/// Menu path without the item itself, else the toolbar it lives on.
fn category_for(command: &dyn NativeCommand) -> Option<String> {
    if let Some(path) = command.menu_path() {
        if path.len() > 1 {
            let parents = &path[..path.len() - 1];
            let parts: Vec<&str> = parents
                .iter()
                .enumerate()
                .map(|(i, part)| {
                    if i == 0 && part.trim().is_empty() {
                        CONTEXT_MENU_CATEGORY
                    } else {
                        part.as_str()
                    }
                })
                .collect();
            return Some(parts.join(MENU_PATH_SEPARATOR));
        }
    }
    command.toolbar_name()
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
