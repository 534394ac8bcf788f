use crate::layer::{Layer, LayerId};
use crate::symbol::{SymbolLayer, SymbolLayerOptions};

/// Owns the overlay's layers in creation order. Ids are never reused.
#[derive(Debug, Default, Clone)]
pub struct LayerRegistry {
    next_id: u64,
    layers: Vec<SymbolLayer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn add(&mut self, options: SymbolLayerOptions) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(SymbolLayer::new(id, options));
        id
    }

    pub fn get(&self, id: LayerId) -> Option<&SymbolLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut SymbolLayer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    /// First layer with the given name, in creation order.
    pub fn find_by_name(&self, name: &str) -> Option<&SymbolLayer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    pub fn remove(&mut self, id: LayerId) -> Option<SymbolLayer> {
        let idx = self.layers.iter().position(|l| l.id() == id)?;
        Some(self.layers.remove(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolLayer> + '_ {
        self.layers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SymbolLayer> + '_ {
        self.layers.iter_mut()
    }

    /// Removes every layer, returning them in creation order.
    pub fn clear(&mut self) -> Vec<SymbolLayer> {
        std::mem::take(&mut self.layers)
    }
}
