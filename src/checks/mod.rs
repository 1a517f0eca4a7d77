//! The check battery run against the challenging-DOM page.
//!
//! Checks are grouped by the part of the page they inspect: the button
//! column (`.large-2`), the data table and the canvas (both inside
//! `.large-10` containers).

pub mod canvas;
pub mod left_column;
pub mod table;

use crate::browser::{BrowserSession, ElementHandle, Locator, SessionResult};
use crate::harness::CheckError;

pub use canvas::{CanvasScreenshot, CanvasSize};
pub use left_column::{AlertButtons, ButtonCharacters, ButtonDuplicates, ButtonWidth, SuccessButtons};
pub use table::{ActionLinks, Column3Text, ColumnCount};

/// Class of the button column container
pub const LEFT_COLUMN_CLASS: &str = "large-2";

/// Class of the containers holding the table and the canvas
pub const CONTENT_CLASS: &str = "large-10";

/// Short rendering of an element for messages: `<tag#id.class1.class2/>`
pub fn describe(session: &mut dyn BrowserSession, element: &ElementHandle) -> SessionResult<String> {
    let tag = session.tag_name(element)?;
    let mut out = format!("<{}", tag);
    if let Some(id) = session.attribute(element, "id")? {
        if !id.is_empty() {
            out.push('#');
            out.push_str(&id);
        }
    }
    if let Some(classes) = session.attribute(element, "class")? {
        for class in classes.split_whitespace() {
            out.push('.');
            out.push_str(class);
        }
    }
    out.push_str("/>");
    Ok(out)
}

/// The left column container and the `.button` elements inside it
pub(crate) fn left_column_buttons(
    session: &mut dyn BrowserSession,
) -> Result<(ElementHandle, Vec<ElementHandle>), CheckError> {
    let column = session.find_element(None, &Locator::class(LEFT_COLUMN_CLASS))?;
    let buttons = session.find_elements(Some(&column), &Locator::class("button"))?;
    Ok((column, buttons))
}

/// Every `.large-10` container; none at all is a resource failure
pub(crate) fn content_containers(
    session: &mut dyn BrowserSession,
) -> Result<Vec<ElementHandle>, CheckError> {
    let containers = session.find_elements(None, &Locator::class(CONTENT_CLASS))?;
    if containers.is_empty() {
        return Err(CheckError::Resource(
            "no .large-10 content container on the page".to_string(),
        ));
    }
    Ok(containers)
}

/// First `<tag>` inside `scope`, if any
pub(crate) fn first_within(
    session: &mut dyn BrowserSession,
    scope: &ElementHandle,
    tag: &str,
) -> SessionResult<Option<ElementHandle>> {
    Ok(session
        .find_elements(Some(scope), &Locator::tag(tag))?
        .into_iter()
        .next())
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Mock pages shaped like the challenging-DOM page

    use crate::browser::{MockElement, MockPage, MockSession};
    use crate::diagnostics::{Collector, Reporter};
    use crate::harness::{Check, CheckError};

    pub const URL: &str = "https://example.test/challenging_dom";

    pub fn button(text: &str, classes: &str, width: i64) -> MockElement {
        MockElement::new("a")
            .class(classes)
            .text(text)
            .rect(10, 10, width, 40)
    }

    pub fn page(children: impl IntoIterator<Item = MockElement>) -> MockSession {
        MockSession::new(MockPage::new(
            MockElement::new("html")
                .rect(0, 0, 1024, 768)
                .child(MockElement::new("body").children(children)),
        ))
    }

    pub fn left_column(buttons: impl IntoIterator<Item = MockElement>) -> MockElement {
        MockElement::new("div").class("large-2 columns").children(buttons)
    }

    pub fn content(children: impl IntoIterator<Item = MockElement>) -> MockElement {
        MockElement::new("div").class("large-10 columns").children(children)
    }

    pub fn row(cells: &[&str]) -> MockElement {
        MockElement::new("tr").children(cells.iter().map(|c| cell(c)))
    }

    pub fn cell(text: &str) -> MockElement {
        if text == "edit delete" {
            MockElement::new("td")
                .child(MockElement::new("a").attr("href", "#edit").text("edit"))
                .child(MockElement::new("a").attr("href", "#delete").text("delete"))
        } else {
            MockElement::new("td").text(text)
        }
    }

    pub fn table(headers: &[&str], rows: Vec<MockElement>) -> MockElement {
        MockElement::new("table")
            .child(
                MockElement::new("thead").child(
                    MockElement::new("tr")
                        .children(headers.iter().map(|h| MockElement::new("th").text(*h))),
                ),
            )
            .child(MockElement::new("tbody").children(rows))
    }

    /// Run `check` against `session`, collecting everything it emits
    pub fn run(check: &mut dyn Check, session: &mut MockSession) -> (Collector, Result<(), CheckError>) {
        let mut collector = Collector::new(true);
        let outcome = {
            let mut reporter = Reporter::new("under-test", &mut collector);
            check.run(session, &mut reporter)
        };
        (collector, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{MockElement, MockPage, MockSession};

    #[test]
    fn test_describe_with_id_and_classes() {
        let mut session = MockSession::new(MockPage::new(
            MockElement::new("html").child(MockElement::new("a").id("b1").class("button alert")),
        ));
        let el = session.find_element(None, &Locator::tag("a")).unwrap();
        assert_eq!(describe(&mut session, &el).unwrap(), "<a#b1.button.alert/>");
    }

    #[test]
    fn test_describe_bare_element() {
        let mut session = MockSession::new(MockPage::new(
            MockElement::new("html").child(MockElement::new("canvas").id("")),
        ));
        let el = session.find_element(None, &Locator::tag("canvas")).unwrap();
        assert_eq!(describe(&mut session, &el).unwrap(), "<canvas/>");
    }

    #[test]
    fn test_missing_containers_are_resource_errors() {
        let mut session = MockSession::new(MockPage::new(MockElement::new("html")));
        assert!(matches!(left_column_buttons(&mut session), Err(CheckError::Resource(_))));
        assert!(matches!(content_containers(&mut session), Err(CheckError::Resource(_))));
    }
}
