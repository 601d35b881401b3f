//! Quest entities - Lore, PDDL artifacts, and the story state machine

mod lore;
mod pddl;
mod story_graph;

pub use lore::{Bounds, Lore};
pub use pddl::{PddlDomain, PddlProblem};
pub use story_graph::{ActionChoice, StoryGraph, StoryState};
