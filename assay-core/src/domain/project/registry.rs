// assay-core/src/domain/project/registry.rs

use std::collections::{HashMap, HashSet};

use crate::domain::error::DomainError;
use crate::domain::project::model::Model;

/// Every model known to a run, keyed by name.
///
/// The registry is the single source of truth for both the dependency
/// resolver and the constraint evaluator. It is filled once at load time and
/// only read afterwards.
#[derive(Debug, Default, Clone)]
pub struct ModelRegistry {
    models: HashMap<String, Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_models(models: impl IntoIterator<Item = Model>) -> Result<Self, DomainError> {
        let mut registry = Self::new();
        for model in models {
            registry.register(model)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, model: Model) -> Result<(), DomainError> {
        if self.models.contains_key(&model.name) {
            return Err(DomainError::DuplicateModel(model.name));
        }

        let mut seen = HashSet::new();
        for column in &model.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DomainError::SchemaError(format!(
                    "Column '{}' is declared twice in model '{}'",
                    column.name, model.name
                )));
            }
        }

        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Model, DomainError> {
        self.models
            .get(name)
            .ok_or_else(|| DomainError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// All registered models, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::model::Column;

    #[test]
    fn test_register_and_get() {
        let mut registry = ModelRegistry::new();
        registry.register(Model::new("transformed_channel")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("transformed_channel"));
        assert_eq!(
            registry.get("transformed_channel").unwrap().name,
            "transformed_channel"
        );
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register(Model::new("a")).unwrap();

        let result = registry.register(Model::new("a"));
        assert!(matches!(result, Err(DomainError::DuplicateModel(name)) if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_model() {
        let registry = ModelRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(DomainError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let model = Model::new("a")
            .with_column(Column::new("id"))
            .with_column(Column::new("id"));

        let result = ModelRegistry::from_models([model]);
        assert!(matches!(result, Err(DomainError::SchemaError(_))));
    }

    #[test]
    fn test_all_yields_every_model() {
        let registry =
            ModelRegistry::from_models([Model::new("a"), Model::new("b"), Model::new("c")])
                .unwrap();

        let mut names: Vec<&str> = registry.all().map(|m| m.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
