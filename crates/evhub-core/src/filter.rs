//! Listener event filters.
//!
//! An empty accepted-type set means "accept every event type". This is an
//! explicit policy: monitor clients that do not ask for specific types get
//! the full stream.

use std::collections::BTreeSet;

use evhub_types::event::Event;

/// The set of event types (and optionally the project) a listener opted into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    types: BTreeSet<String>,
    project: Option<String>,
}

impl EventFilter {
    /// Accept every event type from every project.
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept only the given event types.
    pub fn types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            project: None,
        }
    }

    /// Parse a comma-separated type list such as `lifecycle,operation`.
    /// Blank entries are ignored, so `""` yields an accept-all filter.
    pub fn parse_types(list: &str) -> Self {
        Self::types(
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        )
    }

    /// Restrict to events of `project`. Events that carry no project still match.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn accepts_all_types(&self) -> bool {
        self.types.is_empty()
    }

    pub fn accepted_types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn matches(&self, event: &Event) -> bool {
        if !self.types.is_empty() && !self.types.contains(&event.event_type) {
            return false;
        }

        match (&self.project, &event.project) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evhub_types::event::{TYPE_LIFECYCLE, TYPE_LOGGING, TYPE_OPERATION};
    use serde_json::Value;

    fn event(kind: &str) -> Event {
        Event::new(kind, Value::Null)
    }

    #[test]
    fn typed_filter_accepts_only_listed_types() {
        let filter = EventFilter::types([TYPE_LIFECYCLE]);
        assert!(filter.matches(&event(TYPE_LIFECYCLE)));
        assert!(!filter.matches(&event(TYPE_OPERATION)));
        assert!(!filter.matches(&event(TYPE_LOGGING)));
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = EventFilter::all();
        assert!(filter.accepts_all_types());
        assert!(filter.matches(&event(TYPE_LIFECYCLE)));
        assert!(filter.matches(&event(TYPE_OPERATION)));
        assert!(filter.matches(&event("custom")));
    }

    #[test]
    fn parse_types_skips_blank_entries() {
        let filter = EventFilter::parse_types(" lifecycle, ,operation,");
        let types: Vec<&str> = filter.accepted_types().collect();
        assert_eq!(types, vec!["lifecycle", "operation"]);

        assert!(EventFilter::parse_types("").accepts_all_types());
    }

    #[test]
    fn project_filter_skips_other_projects() {
        let filter = EventFilter::all().with_project("default");
        assert!(filter.matches(&event(TYPE_LIFECYCLE).with_project("default")));
        assert!(!filter.matches(&event(TYPE_LIFECYCLE).with_project("staging")));
    }

    #[test]
    fn project_filter_passes_projectless_events() {
        let filter = EventFilter::types([TYPE_OPERATION]).with_project("default");
        assert!(filter.matches(&event(TYPE_OPERATION)));
        assert!(!filter.matches(&event(TYPE_LIFECYCLE)));
    }

    #[test]
    fn unrestricted_filter_passes_all_projects() {
        let filter = EventFilter::all();
        assert!(filter.matches(&event(TYPE_LIFECYCLE).with_project("staging")));
    }
}
