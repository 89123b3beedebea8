use std::ffi::c_void;
use std::sync::mpsc as std_mpsc;

use core_foundation::base::TCFType;
use core_foundation::runloop::{
    kCFRunLoopCommonModes, CFRunLoop, CFRunLoopSource,
};

use crate::core::ProfileId;
use crate::event::Event;
use crate::macos::accessibility::{
    notification, AXError, AXObserver, AXObserverRef, AXUIElement, AXUIElementRef,
};

struct CallbackContext {
    profile_id: ProfileId,
    event_tx: std_mpsc::Sender<Event<AXUIElement>>,
}

/// Resize notifications for one window. Removing the notification, detaching the run loop
/// source and freeing the callback context all happen on drop.
pub struct ResizeObservation {
    observer: AXObserver,
    window: AXUIElement,
    source: CFRunLoopSource,
    context: *mut CallbackContext,
}

pub fn observe_resize(
    pid: i32,
    window: &AXUIElement,
    profile_id: ProfileId,
    event_tx: std_mpsc::Sender<Event<AXUIElement>>,
) -> Result<ResizeObservation, AXError> {
    let observer = AXObserver::new(pid, observer_callback)?;

    let context = Box::into_raw(Box::new(CallbackContext {
        profile_id,
        event_tx,
    }));
    if let Err(e) =
        observer.add_notification(window, notification::WINDOW_RESIZED, context as *mut c_void)
    {
        drop(unsafe { Box::from_raw(context) });
        return Err(e);
    }

    let source = unsafe { CFRunLoopSource::wrap_under_get_rule(observer.run_loop_source()) };
    CFRunLoop::get_main().add_source(&source, unsafe { kCFRunLoopCommonModes });
    tracing::debug!("Observing resizes for pid {}", pid);

    Ok(ResizeObservation {
        observer,
        window: window.clone(),
        source,
        context,
    })
}

impl Drop for ResizeObservation {
    fn drop(&mut self) {
        self.observer
            .remove_notification(&self.window, notification::WINDOW_RESIZED);
        CFRunLoop::get_main().remove_source(&self.source, unsafe { kCFRunLoopCommonModes });
        drop(unsafe { Box::from_raw(self.context) });
    }
}

extern "C" fn observer_callback(
    _observer: AXObserverRef,
    _element: AXUIElementRef,
    _notification: core_foundation::string::CFStringRef,
    refcon: *mut c_void,
) {
    if refcon.is_null() {
        return;
    }

    let context = unsafe { &*(refcon as *const CallbackContext) };
    let event = Event::WindowResized {
        profile_id: context.profile_id.clone(),
    };
    if let Err(e) = context.event_tx.send(event) {
        tracing::error!("Failed to send resize event: {}", e);
    }
}
