//! Interned names for node names, property names and labels.
//!
//! Devicetree sources repeat the same handful of identifiers (`compatible`,
//! `reg`, `status`, label names) across many files. [`Name`] interns them in
//! a process-wide string interner so that comparisons and hashing are a
//! single integer operation.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner backing every [`Name`].
///
/// # Thread Safety
///
/// Access goes through a `Mutex`, so names can be created from any thread.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An interned identifier.
///
/// # Examples
///
/// ```
/// use dtlink_core::identifier::Name;
///
/// let compatible = Name::new("compatible");
/// assert_eq!(compatible, Name::new("compatible"));
/// assert_eq!(compatible, "compatible");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(DefaultSymbol);

impl Name {
    /// Interns `text` and returns its name.
    pub fn new(text: &str) -> Self {
        Self(interner().get_or_intern(text))
    }

    /// Runs `f` with the interned text of this name.
    ///
    /// Prefer this over `to_string()` on hot paths; it avoids an allocation.
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        let interner = interner();
        let text = interner.resolve(self.0).unwrap_or_default();
        f(text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.with_str(str::to_owned);
        f.write_str(&text)
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl PartialEq<str> for Name {
    /// Allows direct comparison with string slices: `name == "reg"`
    fn eq(&self, other: &str) -> bool {
        self.with_str(|text| text == other)
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
