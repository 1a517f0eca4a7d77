//! The ordered check registry.
//!
//! Checks run in exactly the order listed here; identifiers are stable and
//! are what `--only` selects on.

use thiserror::Error;

use super::types::CheckDescriptor;
use crate::checks::{
    ActionLinks, AlertButtons, ButtonCharacters, ButtonDuplicates, ButtonWidth, CanvasScreenshot,
    CanvasSize, Column3Text, ColumnCount, SuccessButtons,
};

const DEFAULT_CHECKS: [CheckDescriptor; 10] = [
    CheckDescriptor::new(
        "left-column-button-width",
        "left column buttons share one width",
        ButtonWidth::build,
    ),
    CheckDescriptor::new(
        "left-column-button-characters",
        "left column button text has no control characters",
        ButtonCharacters::build,
    ),
    CheckDescriptor::new(
        "left-column-button-duplicates",
        "left column buttons have distinct text",
        ButtonDuplicates::build,
    ),
    CheckDescriptor::new(
        "left-column-alert-buttons",
        "no left column button is styled as an alert",
        AlertButtons::build,
    ),
    CheckDescriptor::new(
        "left-column-success-buttons",
        "at least one left column button is styled as a success",
        SuccessButtons::build,
    ),
    CheckDescriptor::new(
        "table-column-count",
        "table header and rows have 8 columns",
        ColumnCount::build,
    ),
    CheckDescriptor::new(
        "table-column3-text",
        "table cell 3 starts with 'DefinieBas'",
        Column3Text::build,
    ),
    CheckDescriptor::new(
        "table-action-links",
        "every Action cell holds two links",
        ActionLinks::build,
    ),
    CheckDescriptor::new(
        "canvas-size",
        "canvas is at least 600x200",
        CanvasSize::build,
    ),
    CheckDescriptor::new(
        "canvas-screenshot",
        "canvas capture matches the reference image",
        CanvasScreenshot::build,
    ),
];

/// Every check, in run order
pub fn default_registry() -> Vec<CheckDescriptor> {
    DEFAULT_CHECKS.to_vec()
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown check '{0}'")]
pub struct UnknownCheck(pub String);

/// Restrict `registry` to `ids`, keeping registry order. An empty selection keeps everything.
pub fn select(registry: Vec<CheckDescriptor>, ids: &[String]) -> Result<Vec<CheckDescriptor>, UnknownCheck> {
    if let Some(unknown) = ids.iter().find(|id| !registry.iter().any(|d| d.id == id.as_str())) {
        return Err(UnknownCheck(unknown.clone()));
    }
    if ids.is_empty() {
        return Ok(registry);
    }
    Ok(registry
        .into_iter()
        .filter(|d| ids.iter().any(|id| id == d.id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_registry_order() {
        let ids: Vec<_> = default_registry().iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            vec![
                "left-column-button-width",
                "left-column-button-characters",
                "left-column-button-duplicates",
                "left-column-alert-buttons",
                "left-column-success-buttons",
                "table-column-count",
                "table-column3-text",
                "table-action-links",
                "canvas-size",
                "canvas-screenshot",
            ]
        );
    }

    #[test]
    fn test_ids_unique() {
        let registry = default_registry();
        let ids: HashSet<_> = registry.iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), registry.len());
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let ids = vec!["canvas-size".to_string(), "left-column-button-width".to_string()];
        let selected: Vec<_> = select(default_registry(), &ids)
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(selected, vec!["left-column-button-width", "canvas-size"]);
    }

    #[test]
    fn test_select_rejects_unknown() {
        let ids = vec!["no-such-check".to_string()];
        assert_eq!(
            select(default_registry(), &ids).unwrap_err(),
            UnknownCheck("no-such-check".to_string())
        );
    }
}
