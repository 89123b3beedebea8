use std::path::Path;

use pinbar_ipc::{Command, HotKeyInfo, ProfileInfo, Response};

use crate::core::{format_hotkey, hotkey_display_string, parse_hotkey, PinProfile, ProfileId};
use crate::error::HotkeyError;

use super::context::AppContext;

fn profile_info(profile: &PinProfile) -> ProfileInfo {
    ProfileInfo {
        id: profile.id.to_string(),
        display_name: profile.display_name.clone(),
        bundle_id: profile.bundle_id.clone(),
        app_path: profile.app_path.clone(),
        use_app_icon: profile.use_app_icon,
        use_template_icon: profile.use_template_icon,
        hotkey: profile.hot_key.map(|setting| HotKeyInfo {
            key: format_hotkey(&setting),
            display: hotkey_display_string(&setting),
        }),
    }
}

fn lookup<W>(ctx: &AppContext<W>, key: &str) -> Result<ProfileId, Response>
where
    W: Clone + PartialEq + std::fmt::Debug,
{
    ctx.find_profile(key)
        .ok_or_else(|| Response::error(format!("no profile matches {}", key)))
}

fn into_response<E: std::fmt::Display>(result: Result<(), E>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => Response::error(e.to_string()),
    }
}

/// Handle one IPC request on the main loop.
pub fn process_command<W>(ctx: &mut AppContext<W>, cmd: &Command) -> Response
where
    W: Clone + PartialEq + std::fmt::Debug,
{
    match cmd {
        Command::ListProfiles => Response::Profiles {
            profiles: ctx.profiles().iter().map(profile_info).collect(),
        },
        Command::AddProfile { app_path } => match ctx.add(Path::new(app_path)) {
            Ok(id) => Response::ProfileId { id: id.to_string() },
            Err(e) => Response::error(e.to_string()),
        },
        Command::RemoveProfile { id } => match lookup(ctx, id) {
            Ok(id) => into_response(ctx.remove(&id)),
            Err(response) => response,
        },
        Command::SetIcon {
            id,
            use_app_icon,
            use_template_icon,
        } => match lookup(ctx, id) {
            Ok(id) => into_response(ctx.set_icon(&id, *use_app_icon, *use_template_icon)),
            Err(response) => response,
        },
        Command::Toggle { id } => match lookup(ctx, id) {
            Ok(id) => into_response(ctx.toggle(&id)),
            Err(response) => response,
        },
        Command::ResetWindowSize { id } => match lookup(ctx, id) {
            Ok(id) => into_response(ctx.reset_window_size(&id)),
            Err(response) => response,
        },
        Command::Bind { id, key } => {
            let id = match lookup(ctx, id) {
                Ok(id) => id,
                Err(response) => return response,
            };
            match parse_hotkey(key) {
                Ok(setting) => into_response(ctx.set_hotkey(&id, Some(setting))),
                Err(e) => Response::error(HotkeyError::Parse(e).to_string()),
            }
        }
        Command::Unbind { id } => match lookup(ctx, id) {
            Ok(id) => into_response(ctx.set_hotkey(&id, None)),
            Err(response) => response,
        },
        Command::Quit => {
            tracing::info!("Quit command received");
            Response::Ok
        }
    }
}
