//! Ordered layer list with an always-valid active layer.
//!
//! Layers only partition annotations for visibility and deletion; they do not
//! decide compositing order.

use std::collections::HashSet;

use crate::model::{Layer, LayerId};

pub const BASE_LAYER_ID: &str = "base";
pub const BASE_LAYER_NAME: &str = "Base Annotations";

#[derive(Debug, Clone)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: LayerId,
    next_seq: u64,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// A stack seeded with the single visible base layer, which is active.
    pub fn new() -> Self {
        let base = Layer {
            id: LayerId::new(BASE_LAYER_ID),
            name: BASE_LAYER_NAME.to_string(),
            is_visible: true,
        };
        Self {
            active: base.id.clone(),
            layers: vec![base],
            next_seq: 1,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// A stack always holds at least one layer.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn active(&self) -> &LayerId {
        &self.active
    }

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn visible_ids(&self) -> HashSet<&LayerId> {
        self.layers
            .iter()
            .filter(|l| l.is_visible)
            .map(|l| &l.id)
            .collect()
    }

    /// Appends a new visible layer and makes it active.
    pub fn add(&mut self) -> LayerId {
        let mut id = LayerId::new(format!("layer-{}", self.next_seq));
        while self.contains(&id) {
            self.next_seq += 1;
            id = LayerId::new(format!("layer-{}", self.next_seq));
        }
        self.next_seq += 1;

        let name = format!("Layer {}", self.layers.len() + 1);
        log::debug!("adding layer {id} ({name})");
        self.layers.push(Layer {
            id: id.clone(),
            name,
            is_visible: true,
        });
        self.active = id.clone();
        id
    }

    /// Flips visibility. Returns false if the layer does not exist.
    pub fn toggle_visibility(&mut self, id: &LayerId) -> bool {
        match self.layers.iter_mut().find(|l| &l.id == id) {
            Some(layer) => {
                layer.is_visible = !layer.is_visible;
                true
            }
            None => false,
        }
    }

    /// Removes a layer. Refused for the last remaining layer or an unknown id.
    /// When the active layer goes, the first remaining layer becomes active.
    pub fn remove(&mut self, id: &LayerId) -> bool {
        if self.layers.len() <= 1 {
            log::debug!("refusing to delete the last layer {id}");
            return false;
        }
        let Some(index) = self.layers.iter().position(|l| &l.id == id) else {
            return false;
        };
        self.layers.remove(index);
        if &self.active == id {
            self.active = self.layers[0].id.clone();
        }
        log::debug!("deleted layer {id}, active is now {}", self.active);
        true
    }

    /// Routes future commits to `id`. Unknown ids are ignored.
    pub fn set_active(&mut self, id: &LayerId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.active = id.clone();
        true
    }
}
