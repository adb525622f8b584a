//! Entry filters and the AND pipeline that combines them.
//!
//! Each filter declares its optional capabilities up front; the pipeline reads
//! them once when the filter is registered and dispatches on the stored set.

use std::collections::BTreeMap;

use crate::tree::Entry;

pub type FilterId = &'static str;

pub const NAME_FILTER: FilterId = "name";
pub const LANGUAGE_FILTER: FilterId = "language";

/// Optional behaviour a filter supports beyond being a predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub updatable: bool,
    pub viewable: bool,
    pub resettable: bool,
    pub toggleable: bool,
}

/// Input forwarded to updatable filters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterInput {
    Char(char),
    Backspace,
    Clear,
    SelectLanguages(Vec<String>),
}

pub trait EntryFilter {
    fn id(&self) -> FilterId;

    fn accepts(&self, entry: &Entry) -> bool;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn toggle(&mut self) {}

    fn reset(&mut self) {}

    fn update(&mut self, _input: &FilterInput) {}

    fn view(&self) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// NameFilter
// ---------------------------------------------------------------------------

/// Case-insensitive substring match on the entry's name.
#[derive(Debug, Default)]
pub struct NameFilter {
    query: String,
    enabled: bool,
}

impl NameFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryFilter for NameFilter {
    fn id(&self) -> FilterId {
        NAME_FILTER
    }

    fn accepts(&self, entry: &Entry) -> bool {
        entry
            .name()
            .to_lowercase()
            .contains(&self.query.to_lowercase())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            updatable: true,
            viewable: true,
            resettable: true,
            toggleable: true,
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    fn reset(&mut self) {
        self.query.clear();
    }

    fn update(&mut self, input: &FilterInput) {
        if !self.enabled {
            return;
        }
        match input {
            FilterInput::Char(c) => self.query.push(*c),
            FilterInput::Backspace => {
                self.query.pop();
            }
            FilterInput::Clear => self.query.clear(),
            FilterInput::SelectLanguages(_) => {}
        }
    }

    fn view(&self) -> Option<String> {
        Some(self.query.clone())
    }
}

// ---------------------------------------------------------------------------
// LanguageFilter
// ---------------------------------------------------------------------------

/// Keeps entries with at least one line in any of the selected languages.
/// Enabled exactly when a selection is present.
#[derive(Debug, Default)]
pub struct LanguageFilter {
    languages: Vec<String>,
}

impl LanguageFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryFilter for LanguageFilter {
    fn id(&self) -> FilterId {
        LANGUAGE_FILTER
    }

    fn accepts(&self, entry: &Entry) -> bool {
        self.languages
            .iter()
            .any(|lang| entry.stats_for(Some(lang)).total() > 0)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            updatable: true,
            resettable: true,
            ..Capabilities::default()
        }
    }

    fn is_enabled(&self) -> bool {
        !self.languages.is_empty()
    }

    fn reset(&mut self) {
        self.languages.clear();
    }

    fn update(&mut self, input: &FilterInput) {
        if let FilterInput::SelectLanguages(langs) = input {
            self.languages = langs.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// FilterPipeline
// ---------------------------------------------------------------------------

struct Registered {
    filter: Box<dyn EntryFilter>,
    caps: Capabilities,
}

/// Filters keyed by id; an entry is valid when every enabled filter accepts it.
#[derive(Default)]
pub struct FilterPipeline {
    filters: BTreeMap<FilterId, Registered>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl EntryFilter + 'static) -> Self {
        self.register(Box::new(filter));
        self
    }

    /// Add a filter, replacing any previous filter with the same id.
    pub fn register(&mut self, filter: Box<dyn EntryFilter>) {
        let caps = filter.capabilities();
        self.filters.insert(filter.id(), Registered { filter, caps });
    }

    pub fn valid(&self, entry: &Entry) -> bool {
        self.filters
            .values()
            .filter(|r| r.filter.is_enabled())
            .all(|r| r.filter.accepts(entry))
    }

    pub fn toggle(&mut self, id: FilterId) {
        if let Some(r) = self.filters.get_mut(id) {
            if r.caps.toggleable {
                r.filter.toggle();
            }
        }
    }

    pub fn reset(&mut self) {
        for r in self.filters.values_mut().filter(|r| r.caps.resettable) {
            r.filter.reset();
        }
    }

    pub fn update(&mut self, input: &FilterInput) {
        for r in self.filters.values_mut().filter(|r| r.caps.updatable) {
            r.filter.update(input);
        }
    }

    pub fn is_enabled(&self, id: FilterId) -> bool {
        self.filters
            .get(id)
            .is_some_and(|r| r.filter.is_enabled())
    }

    /// Display text of an enabled, viewable filter.
    pub fn view(&self, id: FilterId) -> Option<String> {
        let r = self.filters.get(id)?;
        if !r.caps.viewable || !r.filter.is_enabled() {
            return None;
        }
        r.filter.view()
    }
}
