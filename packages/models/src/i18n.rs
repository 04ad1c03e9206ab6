//! Localized string lookup.
//!
//! Message ids are the English source strings. Placeholders use the
//! `{name}` form and are substituted after translation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A message catalog mapping source strings to their translation.
///
/// Lookups of unknown ids return the id itself, so an empty catalog is
/// the identity translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    messages: BTreeMap<String, String>,
}

impl Catalog {
    /// Creates a catalog from `(msgid, translation)` pairs.
    #[must_use]
    pub fn new(messages: BTreeMap<String, String>) -> Self {
        Self { messages }
    }

    /// Translates `msgid`.
    #[must_use]
    pub fn gettext<'a>(&'a self, msgid: &'a str) -> &'a str {
        self.messages.get(msgid).map_or(msgid, String::as_str)
    }

    /// Translates `msgid` and substitutes `{name}` placeholders.
    #[must_use]
    pub fn format(&self, msgid: &str, args: &[(&str, &str)]) -> String {
        let mut out = self.gettext(msgid).to_string();
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}
