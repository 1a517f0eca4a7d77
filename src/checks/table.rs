//! Checks over the first `<table>` of each `.large-10` container.
//!
//! Containers without a table are skipped; only the first table of a
//! container is inspected, and its header is assumed to be a single row.

use super::{content_containers, first_within};
use crate::browser::{BrowserSession, ElementHandle, Locator};
use crate::diagnostics::Reporter;
use crate::harness::{Check, CheckContext, CheckError, ConstructionError};

/// Columns every header and body row must have
pub const COLUMN_COUNT: usize = 8;

/// Index of the cell checked by [`Column3Text`]
pub const TEXT_COLUMN: usize = 3;

/// Required prefix of the text in [`TEXT_COLUMN`]
pub const TEXT_PREFIX: &str = "DefinieBas";

/// Header text of the column holding the row actions
pub const ACTION_HEADER: &str = "Action";

/// Links each action cell must hold
pub const ACTION_LINK_COUNT: usize = 2;

/// First table of every container that has one
fn tables(session: &mut dyn BrowserSession) -> Result<Vec<ElementHandle>, CheckError> {
    let mut tables = Vec::new();
    for container in content_containers(session)? {
        match first_within(session, &container, "table")? {
            Some(table) => tables.push(table),
            None => tracing::trace!("container without a table"),
        }
    }
    Ok(tables)
}

/// `<tr>` rows of the table body
fn body_rows(
    session: &mut dyn BrowserSession,
    table: &ElementHandle,
) -> Result<Vec<ElementHandle>, CheckError> {
    let tbody = session.find_element(Some(table), &Locator::tag("tbody"))?;
    Ok(session.find_elements(Some(&tbody), &Locator::tag("tr"))?)
}

fn cells(
    session: &mut dyn BrowserSession,
    row: &ElementHandle,
) -> Result<Vec<ElementHandle>, CheckError> {
    Ok(session.find_elements(Some(row), &Locator::tag("td"))?)
}

/// Header and body rows must all have [`COLUMN_COUNT`] columns
#[derive(Debug)]
pub struct ColumnCount {
    url: String,
}

impl ColumnCount {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for ColumnCount {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;

        for table in tables(session)? {
            let thead = session.find_element(Some(&table), &Locator::tag("thead"))?;
            let headers = session.find_elements(Some(&thead), &Locator::tag("th"))?;
            if headers.len() != COLUMN_COUNT {
                reporter.error(format_args!(
                    "Table header does not contain required number of columns ({}): {}",
                    COLUMN_COUNT,
                    headers.len()
                ));
            }

            for (index, row) in body_rows(session, &table)?.iter().enumerate() {
                let found = cells(session, row)?.len();
                if found != COLUMN_COUNT {
                    reporter.error(format_args!(
                        "Row {} does not contain required number of columns ({}): {}",
                        index, COLUMN_COUNT, found
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Cell [`TEXT_COLUMN`] of every body row must start with [`TEXT_PREFIX`]
#[derive(Debug)]
pub struct Column3Text {
    url: String,
}

impl Column3Text {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for Column3Text {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;

        for table in tables(session)? {
            for (index, row) in body_rows(session, &table)?.iter().enumerate() {
                let Some(cell) = cells(session, row)?.into_iter().nth(TEXT_COLUMN) else {
                    reporter.error(format_args!("Row {} has no cell {}", index, TEXT_COLUMN));
                    continue;
                };
                let text = session.text(&cell)?;
                if !text.starts_with(TEXT_PREFIX) {
                    reporter.error(format_args!(
                        "Row {}, cell {} does not start with the required prefix '{}': '{}'",
                        index, TEXT_COLUMN, TEXT_PREFIX, text
                    ));
                }
            }
        }
        Ok(())
    }
}

/// The [`ACTION_HEADER`] column of every row must hold exactly two links
#[derive(Debug)]
pub struct ActionLinks {
    url: String,
}

impl ActionLinks {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl ActionLinks {
    /// Index of the first header whose text is [`ACTION_HEADER`]
    fn action_column(
        session: &mut dyn BrowserSession,
        table: &ElementHandle,
    ) -> Result<Option<usize>, CheckError> {
        let headers = session.find_elements(Some(table), &Locator::tag("th"))?;
        for (index, header) in headers.iter().enumerate() {
            if session.text(header)?.trim() == ACTION_HEADER {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl Check for ActionLinks {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;

        for table in tables(session)? {
            let Some(column) = Self::action_column(session, &table)? else {
                reporter.error(format_args!("Could not find an \"{}\" column header", ACTION_HEADER));
                continue;
            };
            reporter.debug(format_args!("\"{}\" is column {}", ACTION_HEADER, column));

            for (index, row) in body_rows(session, &table)?.iter().enumerate() {
                let Some(cell) = cells(session, row)?.into_iter().nth(column) else {
                    reporter.error(format_args!("Row {} has no action column {}", index, column));
                    continue;
                };
                let links = session.find_elements(Some(&cell), &Locator::tag("a"))?;
                if links.len() != ACTION_LINK_COUNT {
                    reporter.error(format_args!(
                        "Row {} does not have required {} <a> links for action column {}",
                        index, ACTION_LINK_COUNT, column
                    ));
                }
            }
        }
        Ok(())
    }
}
