//! Result formatting
//!
//! Turns an [`EvaluationResult`] into display rows. A scalar becomes a
//! single row; a sequence yields one row per item, in result order.

use xpt_engine::EvaluationResult;

/// One displayed result item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    text: String,
}

impl ResultRow {
    /// Create new row
    #[inline]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Displayed text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text placed on the clipboard by the row's copy action
    ///
    /// This is the displayed text, so a trimmed row copies trimmed.
    #[inline]
    #[must_use]
    pub fn copy_text(&self) -> &str {
        &self.text
    }
}

/// Strip surrounding whitespace and enclosing CR/LF until stable
#[must_use]
pub fn trim_text(text: &str) -> &str {
    let mut current = text;
    loop {
        let next = current.trim().trim_matches(&['\r', '\n'][..]);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Build rows from item texts; absent texts produce no row
pub fn format_texts<I>(texts: I, trim: bool) -> Vec<ResultRow>
where
    I: IntoIterator<Item = Option<String>>,
{
    texts
        .into_iter()
        .flatten()
        .map(|text| {
            if trim {
                ResultRow::new(trim_text(&text))
            } else {
                ResultRow::new(text)
            }
        })
        .collect()
}

/// Build rows for an evaluation result
#[must_use]
pub fn format_result(result: &EvaluationResult, trim: bool) -> Vec<ResultRow> {
    format_texts(
        result.items().iter().map(|item| Some(item.to_string())),
        trim,
    )
}
