mod acquire;
mod config;
mod geometry;
mod hotkey;
mod keys;
mod launching;
mod placement;
mod profile;
mod runtime;
mod store;

pub use acquire::*;
pub use config::*;
pub use geometry::*;
pub use hotkey::*;
pub use keys::*;
pub use launching::*;
pub use placement::*;
pub use profile::*;
pub use runtime::*;
pub use store::*;
