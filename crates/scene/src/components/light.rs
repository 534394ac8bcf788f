/// Light sources understood by the render backend. Directional lights take
/// their position from the owning node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient { color: u32, intensity: f64 },
    Directional { color: u32, intensity: f64 },
}

impl Light {
    pub fn ambient(color: u32) -> Self {
        Light::Ambient {
            color,
            intensity: 1.0,
        }
    }

    pub fn directional(color: u32, intensity: f64) -> Self {
        Light::Directional { color, intensity }
    }
}
