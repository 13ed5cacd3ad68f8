//! Adventure event resolution: content, template generation, selection,
//! conversion and application against the player state.

pub mod apply;
pub mod content;
pub mod convert;
pub mod harvest;
pub mod logic;
pub mod rng;
pub mod sect;
pub mod selector;
pub mod session;
pub mod state;
pub mod templates;

pub use logic::{AdventureEngine, AdventureReport, AdventureRequest};
pub use session::AdventureSession;
