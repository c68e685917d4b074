use std::{fs, path::Path, sync::Arc};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::{
    builtin,
    error::CatalogError,
    scenario::{BusinessType, Scenario, ScenarioCategory},
};

static BUILTIN: Lazy<ScenarioCatalog> = Lazy::new(|| {
    ScenarioCatalog::new(builtin::scenarios()).unwrap_or_else(|err| {
        tracing::error!(error = %err, "built-in scenarios rejected");
        ScenarioCatalog::default()
    })
});

/// Catalog files are either a bare list or `{ "scenarios": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    List(Vec<Scenario>),
    Wrapped { scenarios: Vec<Scenario> },
}

/// Read-only, ordered collection of scenarios keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: IndexMap<String, Arc<Scenario>>,
}

impl ScenarioCatalog {
    /// Builds a catalog, rejecting blank and duplicate ids. Order is preserved.
    pub fn new(scenarios: impl IntoIterator<Item = Scenario>) -> Result<Self, CatalogError> {
        let mut map = IndexMap::new();
        for scenario in scenarios {
            if scenario.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(scenario.title));
            }
            if map.contains_key(&scenario.id) {
                return Err(CatalogError::DuplicateId(scenario.id));
            }
            map.insert(scenario.id.clone(), Arc::new(scenario));
        }
        Ok(Self { scenarios: map })
    }

    /// Process-wide catalog of shipped scenarios, built on first use.
    #[must_use]
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Parses a JSON catalog.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let scenarios = match serde_json::from_str::<CatalogFile>(raw)? {
            CatalogFile::List(scenarios) | CatalogFile::Wrapped { scenarios } => scenarios,
        };
        Self::new(scenarios)
    }

    /// Reads and parses a JSON catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Looks a scenario up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Scenario>> {
        self.scenarios.get(id)
    }

    /// Every scenario in authored order.
    pub fn all(&self) -> impl Iterator<Item = &Arc<Scenario>> + '_ {
        self.scenarios.values()
    }

    /// Scenarios written for `business`.
    #[must_use]
    pub fn by_business(&self, business: BusinessType) -> Vec<&Arc<Scenario>> {
        self.filter(Some(business), None)
    }

    /// Scenarios of `category`.
    #[must_use]
    pub fn by_category(&self, category: ScenarioCategory) -> Vec<&Arc<Scenario>> {
        self.filter(None, Some(category))
    }

    /// Scenarios matching both criteria; `None` matches anything.
    #[must_use]
    pub fn filter(
        &self,
        business: Option<BusinessType>,
        category: Option<ScenarioCategory>,
    ) -> Vec<&Arc<Scenario>> {
        self.all()
            .filter(|s| business.is_none_or(|b| s.business_type == b))
            .filter(|s| category.is_none_or(|c| s.category == c))
            .collect()
    }

    /// Ids in authored order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.scenarios.keys().map(String::as_str)
    }

    /// Number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"[
        {
            "id": "bakery-order",
            "title": "Cake Order",
            "business_type": "general",
            "category": "routine",
            "transcript": [
                { "speaker": "AI", "text": "Sweet Spot Bakery, how can I help?" },
                { "speaker": "Caller", "text": "I need a birthday cake.", "delay_ms": 400 }
            ],
            "outcome": { "lead_score": 6, "intent": "service_request", "action_taken": "Order Taken" }
        }
    ]"#;

    #[test]
    fn builtin_scenarios_pass_catalog_checks() {
        let checked = ScenarioCatalog::new(builtin::scenarios()).unwrap();
        let shared = ScenarioCatalog::builtin();
        assert_eq!(shared.len(), checked.len());
        assert!(shared.ids().eq(checked.ids()));
        assert!(!shared.is_empty());
    }

    #[test]
    fn builtin_is_shared_and_filterable() {
        let catalog = ScenarioCatalog::builtin();
        assert!(std::ptr::eq(catalog, ScenarioCatalog::builtin()));
        assert_eq!(catalog.all().count(), catalog.len());
        let hvac = catalog.by_business(BusinessType::Hvac);
        assert!(hvac.iter().all(|s| s.business_type == BusinessType::Hvac));
        assert!(catalog.get("hvac-emergency").is_some());
        assert!(catalog.get("does-not-exist").is_none());
        let both = catalog.filter(Some(BusinessType::General), Some(ScenarioCategory::Complaint));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, "general-complaint");
        assert_eq!(catalog.ids().next(), Some("plumbing-emergency"));
        assert!(catalog
            .by_category(ScenarioCategory::Emergency)
            .iter()
            .all(|s| s.category == ScenarioCategory::Emergency));
    }

    #[test]
    fn loads_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = ScenarioCatalog::load(file.path()).unwrap();
        let cake = catalog.get("bakery-order").unwrap();
        assert_eq!(cake.len(), 2);
        assert_eq!(cake.transcript[1].delay_ms, Some(400));
        let wrapped = format!(r#"{{ "scenarios": {SAMPLE} }}"#);
        assert_eq!(ScenarioCatalog::from_json(&wrapped).unwrap().len(), 1);
    }

    #[test]
    fn rejects_duplicate_and_blank_ids() {
        let one = Scenario::new("a", "A", BusinessType::Auto, ScenarioCategory::Routine);
        let err = ScenarioCatalog::new([one.clone(), one]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "a"));
        let blank = Scenario::new(" ", "Blank", BusinessType::Auto, ScenarioCategory::Routine);
        assert!(matches!(
            ScenarioCatalog::new([blank]),
            Err(CatalogError::EmptyId(title)) if title == "Blank"
        ));
    }

    #[test]
    fn reports_io_and_parse_failures() {
        let err = ScenarioCatalog::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(matches!(
            ScenarioCatalog::from_json("{ nope"),
            Err(CatalogError::Parse(_))
        ));
    }
}
