//! Placement options shared by direct placement and symbol layers.

use foundation::math::Vec3;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Scale applied to an object before latitude scaling.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PreScale {
    Uniform(f64),
    Vector(Vec3),
}

impl Default for PreScale {
    fn default() -> Self {
        PreScale::Vector(Vec3::ONE)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid preScale value {0}: number, array of length 3 or {{x, y, z}} object expected")]
pub struct InvalidPreScale(pub Value);

impl PreScale {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            PreScale::Uniform(s) => Vec3::splat(s),
            PreScale::Vector(v) => v,
        }
    }

    /// Strict parse of a JSON pre-scale value.
    pub fn from_value(value: &Value) -> Result<Self, InvalidPreScale> {
        let invalid = || InvalidPreScale(value.clone());
        match value {
            Value::Number(n) => n.as_f64().map(PreScale::Uniform).ok_or_else(invalid),
            Value::Array(items) if items.len() == 3 => {
                let mut out = [0.0; 3];
                for (slot, item) in out.iter_mut().zip(items) {
                    *slot = item.as_f64().ok_or_else(invalid)?;
                }
                Ok(PreScale::Vector(Vec3::from_array(out)))
            }
            Value::Object(map) => {
                let axis = |k: &str| map.get(k).and_then(Value::as_f64).ok_or_else(invalid);
                Ok(PreScale::Vector(Vec3::new(axis("x")?, axis("y")?, axis("z")?)))
            }
            _ => Err(invalid()),
        }
    }

    /// Lenient parse: unsupported shapes fall back to `(1, 1, 1)` with a warning.
    pub fn from_value_or_default(value: &Value) -> Self {
        match Self::from_value(value) {
            Ok(scale) => scale,
            Err(err) => {
                warn!("{err}; defaulting to [1, 1, 1]");
                PreScale::default()
            }
        }
    }
}

impl From<f64> for PreScale {
    fn from(s: f64) -> Self {
        PreScale::Uniform(s)
    }
}

impl From<Vec3> for PreScale {
    fn from(v: Vec3) -> Self {
        PreScale::Vector(v)
    }
}

impl From<[f64; 3]> for PreScale {
    fn from(a: [f64; 3]) -> Self {
        PreScale::Vector(Vec3::from_array(a))
    }
}

impl<'de> Deserialize<'de> for PreScale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(PreScale::from_value_or_default(&value))
    }
}

/// Options for placing an object at a coordinate.
#[derive(Debug, Copy, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacementOptions {
    pub pre_scale: PreScale,
    /// Interpret model units as meters at the target latitude. Unset means
    /// "use the object's stored preference, else `true`".
    pub scale_to_latitude: Option<bool>,
}

impl PlacementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pre_scale(mut self, pre_scale: impl Into<PreScale>) -> Self {
        self.pre_scale = pre_scale.into();
        self
    }

    pub fn with_scale_to_latitude(mut self, enabled: bool) -> Self {
        self.scale_to_latitude = Some(enabled);
        self
    }
}
