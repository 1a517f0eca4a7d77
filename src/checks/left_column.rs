//! Checks over the `.button` anchors of the `.large-2` column

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::{describe, left_column_buttons};
use crate::browser::{BrowserSession, Locator};
use crate::diagnostics::Reporter;
use crate::harness::{Check, CheckContext, CheckError, ConstructionError};

/// All buttons must share one width
#[derive(Debug)]
pub struct ButtonWidth {
    url: String,
}

impl ButtonWidth {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for ButtonWidth {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;
        let (_, buttons) = left_column_buttons(session)?;

        let mut widths = Vec::with_capacity(buttons.len());
        for button in buttons {
            let width = session.size(&button)?.width;
            reporter.debug(format_args!("Button {} is {}px wide", describe(session, &button)?, width));
            widths.push((button, width));
        }

        let (Some(min), Some(max)) = (
            widths.iter().map(|(_, w)| *w).min(),
            widths.iter().map(|(_, w)| *w).max(),
        ) else {
            return Ok(());
        };
        if min == max {
            return Ok(());
        }

        let narrowest = widths.iter().filter(|(_, w)| *w == min).count();
        let widest = widths.iter().filter(|(_, w)| *w == max).count();
        // Report the smaller group; ties blame the wider buttons.
        let (count, width, direction) = if narrowest >= widest {
            (widest, max, "wider")
        } else {
            (narrowest, min, "narrower")
        };
        let sample = widths
            .iter()
            .find(|(_, w)| *w == width)
            .map(|(el, _)| el.clone())
            .ok_or_else(|| CheckError::Resource("button vanished while measuring".to_string()))?;
        reporter.error(format_args!(
            "{} element(s) are {} than the others: {}",
            count,
            direction,
            describe(session, &sample)?
        ));
        Ok(())
    }
}

/// Button text must be free of control characters
#[derive(Debug)]
pub struct ButtonCharacters {
    url: String,
}

impl ButtonCharacters {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for ButtonCharacters {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;
        let (_, buttons) = left_column_buttons(session)?;

        for button in &buttons {
            let text = session.text(button)?;
            let label = describe(session, button)?;
            reporter.debug(format_args!("Button: '{}' with text '{}'", label, text));
            if text.chars().any(char::is_control) {
                reporter.error(format_args!("Invalid character(s) found in element {}", label));
            }
        }
        Ok(())
    }
}

/// No two buttons may carry the same text
#[derive(Debug)]
pub struct ButtonDuplicates {
    url: String,
}

impl ButtonDuplicates {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for ButtonDuplicates {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;
        let (_, buttons) = left_column_buttons(session)?;

        // text -> description of the first button using it
        let mut seen: HashMap<String, String> = HashMap::new();
        for button in &buttons {
            let text = session.text(button)?;
            let label = describe(session, button)?;
            reporter.debug(format_args!("Testing {} with text: \"{}\"", label, text));
            match seen.entry(text) {
                Entry::Vacant(slot) => {
                    slot.insert(label);
                }
                Entry::Occupied(first) => {
                    reporter.error(format_args!(
                        "Button text '{}' is used by both {} and {}",
                        first.key(),
                        first.get(),
                        label
                    ));
                }
            }
        }
        Ok(())
    }
}

/// No button may be styled as an alert
#[derive(Debug)]
pub struct AlertButtons {
    url: String,
}

impl AlertButtons {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for AlertButtons {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;
        let (column, buttons) = left_column_buttons(session)?;
        let alerts = session.find_elements(Some(&column), &Locator::class("alert"))?;
        if alerts.is_empty() {
            return Ok(());
        }

        for button in &buttons {
            let label = describe(session, button)?;
            reporter.debug(format_args!(
                "Testing element with 'alert' to see if it is a 'button': '{}' with text '{}'",
                label,
                session.text(button)?
            ));
            if alerts.contains(button) {
                reporter.error(format_args!("Alert button found: {}", label));
            }
        }
        Ok(())
    }
}

/// At least one button must be styled as a success
#[derive(Debug)]
pub struct SuccessButtons {
    url: String,
}

impl SuccessButtons {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }
}

impl Check for SuccessButtons {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;
        let (column, buttons) = left_column_buttons(session)?;
        let successes = session.find_elements(Some(&column), &Locator::class("success"))?;

        let mut found = 0;
        for button in buttons.iter().filter(|b| successes.contains(*b)) {
            reporter.info(format_args!("Success button found: {}", describe(session, button)?));
            found += 1;
        }
        if found == 0 {
            reporter.error(format_args!("0 'success' elements were found"));
        }
        Ok(())
    }
}
