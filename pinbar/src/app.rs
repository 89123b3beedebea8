mod command;
mod context;
mod effects;
mod scheduler;
mod worker;

#[cfg(target_os = "macos")]
mod channels;

pub use command::process_command;
pub use context::{AppContext, Services};
pub use worker::spawn as spawn_worker;

#[cfg(target_os = "macos")]
pub use native::App;

#[cfg(target_os = "macos")]
mod native {
    use std::cell::RefCell;
    use std::sync::mpsc as std_mpsc;
    use std::time::Instant;

    use anyhow::{Context, Result};
    use core_foundation::runloop::{
        kCFRunLoopCommonModes, CFRunLoop, CFRunLoopTimer, CFRunLoopTimerContext,
        CFRunLoopTimerRef,
    };
    use objc2::MainThreadMarker;
    use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
    use pinbar_ipc::Command;

    use super::channels::{self, IpcCommandWithResponse};
    use super::{process_command, spawn_worker, AppContext, Services};
    use crate::core::{Config, HotkeyRegistry, JsonPreferences, ProfileStore, RetryPolicy};
    use crate::event::Event;
    use crate::ipc;
    use crate::macos::{AXUIElement, CarbonHotkeyRegistrar, StatusItemFactory};
    use crate::platform::{
        MacOSAppLauncher, MacOSAppResolver, MacOSNotifier, MacOSResizeObserver,
        MacOSWindowManipulator, MacOSWindowSystem,
    };

    const TICK_SECONDS: f64 = 0.05;

    struct RunLoopContext {
        mtm: MainThreadMarker,
        ipc_cmd_rx: std_mpsc::Receiver<IpcCommandWithResponse>,
        event_rx: std_mpsc::Receiver<Event<AXUIElement>>,
        app: RefCell<AppContext<AXUIElement>>,
    }

    pub struct App;

    impl App {
        pub fn run() -> Result<()> {
            let mtm =
                MainThreadMarker::new().context("pinbar must be started on the main thread")?;

            // Accessory apps get no Dock icon but still receive status item clicks
            let ns_app = NSApplication::sharedApplication(mtm);
            ns_app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);

            let (tokio_channels, main_channels) = channels::create_channels();
            let channels::MainChannels {
                ipc_cmd_rx,
                event_tx,
                event_rx,
            } = main_channels;

            std::thread::Builder::new()
                .name("pinbar-ipc".to_string())
                .spawn(move || match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt.block_on(channels::run_async(tokio_channels)),
                    Err(e) => tracing::error!("Failed to start tokio runtime: {}", e),
                })?;

            let config = Config::default();
            let prefs_path = JsonPreferences::default_path()
                .context("could not determine the preferences location")?;
            let prefs = JsonPreferences::open(&prefs_path)
                .with_context(|| format!("failed to open {}", prefs_path.display()))?;
            tracing::info!("Preferences: {}", prefs_path.display());

            let jobs = spawn_worker(
                MacOSWindowSystem,
                MacOSAppLauncher,
                RetryPolicy::from_config(&config),
                event_tx.clone(),
            )?;
            let registrar = CarbonHotkeyRegistrar::new(event_tx.clone())
                .context("failed to install the hotkey handler")?;

            let services = Services {
                window_system: Box::new(MacOSWindowSystem),
                manipulator: Box::new(MacOSWindowManipulator),
                observer: Box::new(MacOSResizeObserver::new(event_tx.clone())),
                resolver: Box::new(MacOSAppResolver),
                anchors: Box::new(StatusItemFactory::new(event_tx, mtm)),
                notifier: Box::new(MacOSNotifier::new(mtm)),
                jobs: Box::new(jobs),
            };
            let mut ctx = AppContext::new(
                config,
                services,
                ProfileStore::new(Box::new(prefs)),
                HotkeyRegistry::new(Box::new(registrar)),
            );
            ctx.load();

            let context = Box::new(RunLoopContext {
                mtm,
                ipc_cmd_rx,
                event_rx,
                app: RefCell::new(ctx),
            });
            let mut timer_context = CFRunLoopTimerContext {
                version: 0,
                info: Box::into_raw(context) as *mut _,
                retain: None,
                release: None,
                copyDescription: None,
            };

            let timer = unsafe {
                CFRunLoopTimer::new(
                    core_foundation::date::CFAbsoluteTimeGetCurrent(),
                    TICK_SECONDS,
                    0,
                    0,
                    timer_callback,
                    &mut timer_context,
                )
            };
            // Common modes keep the tick alive while an alert or button tracking loop runs
            CFRunLoop::get_main().add_timer(&timer, unsafe { kCFRunLoopCommonModes });

            tracing::info!("Entering NSApplication run loop");
            ns_app.run();
            tracing::info!("NSApplication run loop exited");
            Ok(())
        }
    }

    extern "C" fn timer_callback(_timer: CFRunLoopTimerRef, info: *mut std::ffi::c_void) {
        let ctx = unsafe { &*(info as *const RunLoopContext) };

        // A modal alert spins a nested run loop from inside this callback
        let Ok(mut app) = ctx.app.try_borrow_mut() else {
            return;
        };

        while let Ok((cmd, resp_tx)) = ctx.ipc_cmd_rx.try_recv() {
            tracing::debug!("Received IPC command: {:?}", cmd);
            let response = process_command(&mut *app, &cmd);
            if resp_tx.blocking_send(response).is_err() {
                tracing::warn!("IPC client went away before the response");
            }

            if matches!(cmd, Command::Quit) {
                app.shutdown();
                ipc::remove_socket();
                NSApplication::sharedApplication(ctx.mtm).terminate(None);
                return;
            }
        }

        while let Ok(event) = ctx.event_rx.try_recv() {
            app.handle_event(event);
        }

        app.fire_timers(Instant::now());
    }
}
