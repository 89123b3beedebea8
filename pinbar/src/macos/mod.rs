mod accessibility;
mod alert;
mod display;
mod hotkey;
mod observer;
mod status_item;
mod workspace;

pub use accessibility::*;
pub use alert::*;
pub use display::*;
pub use hotkey::*;
pub use observer::*;
pub use status_item::*;
pub use workspace::*;
