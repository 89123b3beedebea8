use std::path::{Path, PathBuf};
use std::process::Command;

use objc2::rc::Retained;
use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication, NSWorkspace};
use objc2_foundation::{ns_string, NSBundle, NSString};

use crate::core::TargetApp;
use crate::error::LaunchError;
use crate::platform::RunningApp;

fn running_app_for_pid(pid: i32) -> Option<Retained<NSRunningApplication>> {
    let app = unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(pid) };
    if app.is_none() {
        tracing::warn!("NSRunningApplication not found for pid {}", pid);
    }
    app
}

/// First live process with `bundle_id`.
pub fn find_running_app(bundle_id: &str) -> Option<RunningApp> {
    let bundle_id = NSString::from_str(bundle_id);
    let apps = unsafe { NSRunningApplication::runningApplicationsWithBundleIdentifier(&bundle_id) };
    apps.iter()
        .find(|app| unsafe { !app.isTerminated() })
        .map(|app| unsafe {
            RunningApp {
                pid: app.processIdentifier(),
                hidden: app.isHidden(),
                frontmost: app.isActive(),
            }
        })
}

pub fn hide_app(pid: i32) {
    if let Some(app) = running_app_for_pid(pid) {
        if !unsafe { app.hide() } {
            tracing::debug!("hide returned false for pid {}", pid);
        }
    }
}

pub fn unhide_app(pid: i32) {
    if let Some(app) = running_app_for_pid(pid) {
        if !unsafe { app.unhide() } {
            tracing::debug!("unhide returned false for pid {}", pid);
        }
    }
}

pub fn activate_app(pid: i32) {
    if let Some(app) = running_app_for_pid(pid) {
        let ok =
            unsafe { app.activateWithOptions(NSApplicationActivationOptions::ActivateAllWindows) };
        if ok {
            tracing::debug!("Activated pid {}", pid);
        } else {
            tracing::warn!("activateWithOptions returned false for pid {}", pid);
        }
    }
}

/// Ask LaunchServices to open the bundle at `path`. Returns once `open` has handed the request
/// off; the process may appear later.
pub fn open_app(path: &str) -> Result<(), LaunchError> {
    let output = Command::new("/usr/bin/open")
        .arg(path)
        .output()
        .map_err(|e| LaunchError {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

    if output.status.success() {
        tracing::info!("Opened {}", path);
        Ok(())
    } else {
        Err(LaunchError {
            path: path.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn info_string(bundle: &NSBundle, key: &NSString) -> Option<String> {
    let value = unsafe { bundle.objectForInfoDictionaryKey(key) }?;
    value.downcast_ref::<NSString>().map(|s| s.to_string())
}

pub fn resolve_app_path(path: &Path) -> Option<TargetApp> {
    let ns_path = NSString::from_str(&path.to_string_lossy());
    let bundle = unsafe { NSBundle::bundleWithPath(&ns_path) }?;
    let bundle_id = unsafe { bundle.bundleIdentifier() }?.to_string();

    let display_name = info_string(&bundle, ns_string!("CFBundleDisplayName"))
        .or_else(|| info_string(&bundle, ns_string!("CFBundleName")))
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| bundle_id.clone());

    Some(TargetApp {
        path: path.to_path_buf(),
        bundle_id,
        display_name,
    })
}

pub fn resolve_bundle_id(bundle_id: &str) -> Option<TargetApp> {
    let workspace = unsafe { NSWorkspace::sharedWorkspace() };
    let url = unsafe {
        workspace.URLForApplicationWithBundleIdentifier(&NSString::from_str(bundle_id))
    }?;
    let path = unsafe { url.path() }?;
    resolve_app_path(&PathBuf::from(path.to_string()))
}
