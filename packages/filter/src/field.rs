//! Exact-value list filter on a plain field.

use map_admin_models::{Catalog, RecordQuery};

use crate::FilterChoice;

/// Keeps records whose field renders exactly as the selected value.
///
/// The query parameter is the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    field: String,
    title: String,
}

impl FieldFilter {
    /// Creates a filter on `field`, titled with the field's verbose name.
    #[must_use]
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
        }
    }

    /// The filtered field, which is also the query parameter.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Translated title.
    #[must_use]
    pub fn title(&self, catalog: &Catalog) -> String {
        catalog.gettext(&self.title).to_string()
    }

    /// Applies the filter. An absent or empty value selects everything.
    pub fn apply<Q: RecordQuery>(&self, query: Q, raw: Option<&str>) -> (Q, String) {
        match raw.filter(|v| !v.is_empty()) {
            Some(value) => (query.filter_exact(&self.field, value), value.to_string()),
            None => (query, String::new()),
        }
    }

    /// "All" followed by the distinct values found in `query`.
    #[must_use]
    pub fn choices<Q: RecordQuery>(
        &self,
        query: &Q,
        current: &str,
        catalog: &Catalog,
    ) -> Vec<FilterChoice> {
        let all = FilterChoice {
            value: String::new(),
            label: catalog.gettext("All").to_string(),
            selected: current.is_empty(),
        };

        std::iter::once(all)
            .chain(query.distinct_values(&self.field).into_iter().map(|value| FilterChoice {
                selected: value == current,
                label: value.clone(),
                value,
            }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_admin_models::{FieldDef, FieldKind, FieldValue, ModelMeta, Record};
    use map_admin_store::RecordStore;

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .register(
                ModelMeta::new("tests", "deliveryjob")
                    .with_field(FieldDef::new("status", FieldKind::Char)),
            )
            .unwrap();
        for (pk, status) in [(1, Some("open")), (2, Some("done")), (3, None), (4, Some("open"))] {
            let value = status.map_or(FieldValue::Null, |s| FieldValue::Text(s.to_string()));
            let record = Record::new(pk, format!("Job {pk}")).with_value("status", value);
            store.insert("tests.deliveryjob", record).unwrap();
        }
        store
    }

    #[test]
    fn narrows_to_exact_value() {
        let store = store();
        let filter = FieldFilter::new("status", "Status");

        let (query, current) = filter.apply(store.all("tests.deliveryjob").unwrap(), Some("open"));
        assert_eq!(query.iter().map(|r| r.pk).collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(current, "open");

        let (query, current) = filter.apply(store.all("tests.deliveryjob").unwrap(), Some(""));
        assert_eq!(query.count(), 4);
        assert_eq!(current, "");
    }

    #[test]
    fn lists_distinct_values_after_all() {
        let store = store();
        let filter = FieldFilter::new("status", "Status");
        let query = store.all("tests.deliveryjob").unwrap();

        let choices = filter.choices(&query, "done", &Catalog::default());
        let summary: Vec<(&str, bool)> =
            choices.iter().map(|c| (c.label.as_str(), c.selected)).collect();
        assert_eq!(summary, vec![("All", false), ("open", false), ("done", true)]);
    }
}
