//! English UI strings
//!
//! Descriptors refer to strings by resource name; hosts that localize can
//! look the same names up in their own tables.

/// Resource table base name
pub const RESOURCE_BASE_NAME: &str = "XPathTester";

/// Resource names
pub mod names {
    pub const SHORT_DISPLAY_TITLE: &str = "ShortDisplayTitle";
    pub const LONG_DISPLAY_TITLE: &str = "LongDisplayTitle";
    pub const DESCRIPTION: &str = "Description";
    pub const ACCESSIBLE_NAME: &str = "AccessibleName";
    pub const SEARCH_KEYWORDS: &str = "SearchKeywords";
    pub const OUTPUT_RESULT: &str = "OutputResult";
    pub const OUTPUT_ERROR: &str = "OutputError";
    pub const INPUT_TITLE: &str = "InputTitle";
    pub const INPUT_XPATH_TITLE: &str = "InputXPathTitle";
    pub const STYLE_SETTINGS_TRIM_TITLE: &str = "StyleSettingsTrimTitle";
}

const ENGLISH: &[(&str, &str)] = &[
    (names::SHORT_DISPLAY_TITLE, "XPath Tester"),
    (names::LONG_DISPLAY_TITLE, "XPath Tester"),
    (
        names::DESCRIPTION,
        "Run XPath 1.0 expressions against an XML document and inspect the results",
    ),
    (names::ACCESSIBLE_NAME, "XPath tester tool"),
    (names::SEARCH_KEYWORDS, "xpath xml query path tester"),
    (names::OUTPUT_RESULT, "Result"),
    (names::OUTPUT_ERROR, "Error"),
    (names::INPUT_TITLE, "XML"),
    (names::INPUT_XPATH_TITLE, "XPath"),
    (names::STYLE_SETTINGS_TRIM_TITLE, "Trim whitespace and line breaks"),
];

/// Static string table
#[derive(Debug, Clone, Copy, Default)]
pub struct Resources;

impl Resources {
    /// English text for `name`
    #[must_use]
    pub fn get(name: &str) -> Option<&'static str> {
        ENGLISH
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, text)| *text)
    }

    /// English text for `name`, or the name itself when missing
    #[must_use]
    pub fn get_or_name(name: &str) -> &str {
        Self::get(name).unwrap_or(name)
    }

    /// Every resource name in the table
    pub fn names() -> impl Iterator<Item = &'static str> {
        ENGLISH.iter().map(|(key, _)| *key)
    }
}
