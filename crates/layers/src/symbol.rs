use std::collections::BTreeMap;

use scene::components::Drawable3D;
use scene::entity::EntityId;
use serde::Deserialize;

use crate::layer::{Layer, LayerId};
use crate::options::{PlacementOptions, PreScale};

/// Model instanced once per feature.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelShape {
    Cube { size: f64 },
    Sphere { radius: f64 },
}

impl Default for ModelShape {
    fn default() -> Self {
        ModelShape::Cube { size: 1.0 }
    }
}

impl ModelShape {
    pub fn drawable(self) -> Drawable3D {
        match self {
            ModelShape::Cube { size } => Drawable3D::cube(size),
            ModelShape::Sphere { radius } => Drawable3D::sphere(radius),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolLayerOptions {
    #[serde(alias = "id")]
    pub name: String,
    #[serde(default)]
    pub model: ModelShape,
    #[serde(default)]
    pub scale: PreScale,
    #[serde(default = "default_true")]
    pub scale_with_map_projection: bool,
    /// Feature property that identifies a feature across source updates.
    #[serde(default = "default_key_property")]
    pub key_property: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_key_property() -> Option<String> {
    Some("id".to_string())
}

impl SymbolLayerOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: ModelShape::default(),
            scale: PreScale::default(),
            scale_with_map_projection: true,
            key_property: default_key_property(),
        }
    }

    pub fn with_model(mut self, model: ModelShape) -> Self {
        self.model = model;
        self
    }

    pub fn with_scale(mut self, scale: impl Into<PreScale>) -> Self {
        self.scale = scale.into();
        self
    }

    /// Placement options used for every feature of the layer.
    pub fn placement(&self) -> PlacementOptions {
        PlacementOptions::new()
            .with_pre_scale(self.scale)
            .with_scale_to_latitude(self.scale_with_map_projection)
    }
}

/// Named set of placed objects, one per source feature key.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLayer {
    id: LayerId,
    options: SymbolLayerOptions,
    features: BTreeMap<String, EntityId>,
}

impl SymbolLayer {
    pub fn new(id: LayerId, options: SymbolLayerOptions) -> Self {
        Self {
            id,
            options,
            features: BTreeMap::new(),
        }
    }

    pub fn options(&self) -> &SymbolLayerOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn feature(&self, key: &str) -> Option<EntityId> {
        self.features.get(key).copied()
    }

    /// Features in key order.
    pub fn features(&self) -> impl Iterator<Item = (&str, EntityId)> + '_ {
        self.features.iter().map(|(k, e)| (k.as_str(), *e))
    }

    pub fn entities(&self) -> Vec<EntityId> {
        self.features.values().copied().collect()
    }

    /// Records the object placed for `key`, returning the one it replaces.
    pub fn insert_feature(&mut self, key: impl Into<String>, entity: EntityId) -> Option<EntityId> {
        self.features.insert(key.into(), entity)
    }

    pub fn remove_feature(&mut self, key: &str) -> Option<EntityId> {
        self.features.remove(key)
    }

    /// Drops features whose object fails `keep`.
    pub fn retain_entities(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.features.retain(|_, e| keep(*e));
    }
}

impl Layer for SymbolLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn name(&self) -> &str {
        &self.options.name
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelShape, SymbolLayer, SymbolLayerOptions};
    use crate::layer::{Layer, LayerId};
    use crate::options::PreScale;
    use foundation::handles::Handle;
    use pretty_assertions::assert_eq;
    use scene::entity::EntityId;
    use serde_json::json;

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: SymbolLayerOptions =
            serde_json::from_value(json!({"id": "trees"})).expect("options");
        assert_eq!(opts, SymbolLayerOptions::new("trees"));
        assert_eq!(opts.placement().scale_to_latitude, Some(true));
    }

    #[test]
    fn options_deserialize_model_and_scale() {
        let opts: SymbolLayerOptions = serde_json::from_value(json!({
            "name": "poles",
            "model": {"type": "sphere", "radius": 2.0},
            "scale": [1, 2, 3],
            "scaleWithMapProjection": false,
            "keyProperty": null
        }))
        .expect("options");
        assert_eq!(opts.model, ModelShape::Sphere { radius: 2.0 });
        assert_eq!(opts.scale, PreScale::from([1.0, 2.0, 3.0]));
        assert!(!opts.scale_with_map_projection);
        assert_eq!(opts.key_property, None);
    }

    #[test]
    fn tracks_features_by_key() {
        let mut layer = SymbolLayer::new(LayerId(4), SymbolLayerOptions::new("pins"));
        let a = EntityId(Handle::new(1, 0));
        let b = EntityId(Handle::new(2, 0));
        assert_eq!(layer.insert_feature("b", b), None);
        assert_eq!(layer.insert_feature("a", a), None);
        assert_eq!(layer.id(), LayerId(4));
        assert_eq!(layer.name(), "pins");

        let keys: Vec<&str> = layer.features().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(layer.remove_feature("a"), Some(a));
        assert_eq!(layer.feature("a"), None);
        assert_eq!(layer.entities(), vec![b]);

        layer.retain_entities(|e| e != b);
        assert!(layer.is_empty());
    }
}
