mod attachments;
mod config;
mod core;
mod editor;
mod engine;
mod error;
mod format;
mod history;
mod index;
mod inline;
mod keymap;
mod normalize;
mod ops;
mod position;
mod selection;
mod serde_value;
mod stats;

pub use crate::attachments::*;
pub use crate::config::*;
pub use crate::core::*;
pub use crate::editor::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::format::*;
pub use crate::history::*;
pub use crate::index::*;
pub use crate::inline::{Affinity, Leaf, clamp_to_char_boundary, leaves};
pub use crate::keymap::*;
pub use crate::normalize::normalize;
pub use crate::ops::*;
pub use crate::position::*;
pub use crate::selection::*;
pub use crate::serde_value::*;
pub use crate::stats::*;
