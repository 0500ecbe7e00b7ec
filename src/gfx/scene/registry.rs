//! Named model registry
//!
//! Models are kept in insertion order so the UI lists them, and the passes
//! draw them, in the order the scene declared them.

use crate::config::DuplicatePolicy;
use crate::error::RegistryError;
use crate::gfx::resources::uploader::ResourceUploader;

use super::model::Model;

#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<(String, Model)>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `model` under `name`, replacing any previous model of that name.
    ///
    /// The replaced model's GPU buffers are released. Its position in the
    /// draw order is kept.
    pub fn insert(&mut self, name: &str, model: Model, uploader: &mut dyn ResourceUploader) {
        match self.position(name) {
            Some(index) => {
                log::warn!("Replacing model '{name}'");
                let mut previous = std::mem::replace(&mut self.models[index].1, model);
                previous.release(uploader);
            }
            None => self.models.push((name.to_string(), model)),
        }
    }

    /// Stores `model` under `name` unless that name is taken.
    ///
    /// On rejection the model is returned to the caller untouched, so it can
    /// release or rename it.
    pub fn try_insert(&mut self, name: &str, model: Model) -> Result<(), (RegistryError, Model)> {
        if self.position(name).is_some() {
            return Err((RegistryError::DuplicateName(name.to_string()), model));
        }
        self.models.push((name.to_string(), model));
        Ok(())
    }

    /// Inserts according to `policy`. A rejected model is released and the error logged.
    pub fn register(
        &mut self,
        name: &str,
        model: Model,
        policy: DuplicatePolicy,
        uploader: &mut dyn ResourceUploader,
    ) {
        match policy {
            DuplicatePolicy::Replace => self.insert(name, model, uploader),
            DuplicatePolicy::Reject => {
                if let Err((err, mut rejected)) = self.try_insert(name, model) {
                    log::warn!("{err}; keeping the existing model");
                    rejected.release(uploader);
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Model> {
        self.position(name).map(|index| &self.models[index].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.position(name).map(|index| &mut self.models[index].1)
    }

    /// Removes and returns the model. The caller owns its GPU buffers from here on.
    pub fn remove(&mut self, name: &str) -> Option<Model> {
        self.position(name).map(|index| self.models.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Model)> {
        self.models.iter().map(|(name, model)| (name.as_str(), model))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Model)> {
        self.models
            .iter_mut()
            .map(|(name, model)| (name.as_str(), model))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Releases every model's GPU buffers and forgets them.
    pub fn clear(&mut self, uploader: &mut dyn ResourceUploader) {
        for (_, mut model) in self.models.drain(..) {
            model.release(uploader);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.models.iter().position(|(existing, _)| existing == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::resources::uploader::mock::MockUploader;
    use crate::gfx::resources::uploader::TransformSlotId;

    /// A model that owns a transform slot, so releases are observable.
    fn model_with_slot(shader: &str, slot: u32) -> Model {
        let mut model = Model::empty(shader);
        model.transform_slot = Some(TransformSlotId(slot));
        model
    }

    #[test]
    fn test_insert_keeps_declaration_order() {
        let mut uploader = MockUploader::default();
        let mut registry = ModelRegistry::new();
        registry.insert("sponza", Model::empty("pbr"), &mut uploader);
        registry.insert("helmet", Model::empty("pbr"), &mut uploader);

        let names: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["sponza", "helmet"]);
    }

    #[test]
    fn test_replace_releases_previous_model() {
        let mut uploader = MockUploader::default();
        let mut registry = ModelRegistry::new();
        registry.insert("helmet", model_with_slot("old", 0), &mut uploader);
        registry.insert("other", Model::empty("pbr"), &mut uploader);
        registry.insert("helmet", model_with_slot("new", 1), &mut uploader);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("helmet").map(|m| m.shader.as_str()), Some("new"));
        assert_eq!(uploader.released_transforms, vec![TransformSlotId(0)]);
        // Replacement keeps the original slot in the order.
        assert_eq!(registry.iter().next().map(|(name, _)| name), Some("helmet"));
    }

    #[test]
    fn test_try_insert_rejects_duplicates() {
        let mut registry = ModelRegistry::new();
        registry.try_insert("helmet", Model::empty("first")).unwrap();

        let (err, rejected) = registry
            .try_insert("helmet", Model::empty("second"))
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateName("helmet".to_string()));
        assert_eq!(rejected.shader, "second");
        assert_eq!(registry.get("helmet").map(|m| m.shader.as_str()), Some("first"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reject_policy_releases_the_newcomer() {
        let mut uploader = MockUploader::default();
        let mut registry = ModelRegistry::new();
        registry.register("helmet", model_with_slot("first", 0), DuplicatePolicy::Reject, &mut uploader);
        registry.register("helmet", model_with_slot("second", 1), DuplicatePolicy::Reject, &mut uploader);

        assert_eq!(registry.get("helmet").map(|m| m.shader.as_str()), Some("first"));
        assert_eq!(uploader.released_transforms, vec![TransformSlotId(1)]);
    }

    #[test]
    fn test_get_mut_edits_in_place() {
        let mut uploader = MockUploader::default();
        let mut registry = ModelRegistry::new();
        registry.insert("helmet", Model::empty("pbr"), &mut uploader);

        if let Some(model) = registry.get_mut("helmet") {
            model.transform.translation.y = 10.0;
        }
        assert_eq!(registry.get("helmet").unwrap().transform.translation.y, 10.0);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut uploader = MockUploader::default();
        let mut registry = ModelRegistry::new();
        registry.insert("a", model_with_slot("pbr", 0), &mut uploader);
        registry.insert("b", model_with_slot("pbr", 1), &mut uploader);

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        registry.clear(&mut uploader);

        assert!(registry.is_empty());
        assert_eq!(uploader.released_transforms, vec![TransformSlotId(1)]);
    }
}
