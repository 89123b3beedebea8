pub mod command;

pub use command::{Command, HotKeyInfo, ProfileInfo, Response};
