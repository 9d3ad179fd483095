use serde::{Deserialize, Serialize};
use crate::snapshot::AgentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    Square,
}

/// Visual attributes of an agent. Derived from the agent's kind only;
/// nothing here flows back into a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portrayal {
    pub shape: Shape,
    pub color: [u8; 4], // RGBA
    pub filled: bool,
    /// Radius as a fraction of the cell size (1.0 fills the cell).
    pub radius: f32,
    /// Drawing order, higher layers on top.
    pub layer: u8,
}

impl Portrayal {
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Vacuum => Portrayal {
                shape: Shape::Square,
                color: [30, 90, 200, 255],
                filled: true,
                radius: 1.0,
                layer: 1,
            },
            AgentKind::Dirt => Portrayal {
                shape: Shape::Circle,
                color: [128, 128, 128, 255],
                filled: true,
                radius: 0.2,
                layer: 0,
            },
        }
    }
}
