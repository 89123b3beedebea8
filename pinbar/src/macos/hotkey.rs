use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::mpsc as std_mpsc;

use crate::core::HotKeySetting;
use crate::error::RegistrationError;
use crate::event::Event;
use crate::macos::AXUIElement;
use crate::platform::ShortcutRegistrar;

type OSStatus = i32;
type EventTargetRef = *mut c_void;
type EventHandlerRef = *mut c_void;
type EventHandlerCallRef = *mut c_void;
type EventRef = *mut c_void;
type EventHotKeyRef = *mut c_void;

type EventHandlerUPP =
    extern "C" fn(call: EventHandlerCallRef, event: EventRef, user_data: *mut c_void) -> OSStatus;

#[repr(C)]
struct EventTypeSpec {
    event_class: u32,
    event_kind: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct EventHotKeyID {
    signature: u32,
    id: u32,
}

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    fn GetApplicationEventTarget() -> EventTargetRef;
    fn InstallEventHandler(
        target: EventTargetRef,
        handler: EventHandlerUPP,
        num_types: usize,
        list: *const EventTypeSpec,
        user_data: *mut c_void,
        out_ref: *mut EventHandlerRef,
    ) -> OSStatus;
    fn RemoveEventHandler(handler: EventHandlerRef) -> OSStatus;
    fn RegisterEventHotKey(
        key_code: u32,
        modifiers: u32,
        id: EventHotKeyID,
        target: EventTargetRef,
        options: u32,
        out_ref: *mut EventHotKeyRef,
    ) -> OSStatus;
    fn UnregisterEventHotKey(hotkey: EventHotKeyRef) -> OSStatus;
    fn GetEventParameter(
        event: EventRef,
        name: u32,
        desired_type: u32,
        actual_type: *mut u32,
        buffer_size: usize,
        actual_size: *mut usize,
        data: *mut c_void,
    ) -> OSStatus;
}

const fn four_cc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

const NO_ERR: OSStatus = 0;
const SIGNATURE: u32 = four_cc(b"PNBR");
const EVENT_CLASS_KEYBOARD: u32 = four_cc(b"keyb");
const EVENT_HOTKEY_PRESSED: u32 = 5;
const EVENT_PARAM_DIRECT_OBJECT: u32 = four_cc(b"----");
const TYPE_EVENT_HOTKEY_ID: u32 = four_cc(b"hkid");

type HotkeySender = std_mpsc::Sender<Event<AXUIElement>>;

/// Global shortcuts through the Carbon hotkey API. Unlike an event tap this reports per-shortcut
/// rejection (for example a combination already claimed by another process).
pub struct CarbonHotkeyRegistrar {
    handler: EventHandlerRef,
    sender: *mut HotkeySender,
    hotkeys: HashMap<u32, EventHotKeyRef>,
}

impl CarbonHotkeyRegistrar {
    pub fn new(event_tx: HotkeySender) -> Result<Self, RegistrationError> {
        let sender = Box::into_raw(Box::new(event_tx));
        let event_type = EventTypeSpec {
            event_class: EVENT_CLASS_KEYBOARD,
            event_kind: EVENT_HOTKEY_PRESSED,
        };
        let mut handler: EventHandlerRef = ptr::null_mut();
        let status = unsafe {
            InstallEventHandler(
                GetApplicationEventTarget(),
                hotkey_handler,
                1,
                &event_type,
                sender as *mut c_void,
                &mut handler,
            )
        };
        if status != NO_ERR {
            drop(unsafe { Box::from_raw(sender) });
            return Err(RegistrationError { status });
        }

        tracing::info!("Hotkey handler installed");
        Ok(Self {
            handler,
            sender,
            hotkeys: HashMap::new(),
        })
    }
}

impl ShortcutRegistrar for CarbonHotkeyRegistrar {
    fn register(&mut self, setting: HotKeySetting, id: u32) -> Result<(), RegistrationError> {
        self.unregister(id);

        let hotkey_id = EventHotKeyID {
            signature: SIGNATURE,
            id,
        };
        let mut hotkey: EventHotKeyRef = ptr::null_mut();
        let status = unsafe {
            RegisterEventHotKey(
                setting.key_code,
                setting.modifiers,
                hotkey_id,
                GetApplicationEventTarget(),
                0,
                &mut hotkey,
            )
        };
        if status != NO_ERR {
            return Err(RegistrationError { status });
        }

        self.hotkeys.insert(id, hotkey);
        Ok(())
    }

    fn unregister(&mut self, id: u32) {
        if let Some(hotkey) = self.hotkeys.remove(&id) {
            let status = unsafe { UnregisterEventHotKey(hotkey) };
            if status != NO_ERR {
                tracing::warn!("UnregisterEventHotKey({}) failed with status {}", id, status);
            }
        }
    }
}

impl Drop for CarbonHotkeyRegistrar {
    fn drop(&mut self) {
        let ids: Vec<u32> = self.hotkeys.keys().copied().collect();
        for id in ids {
            self.unregister(id);
        }
        unsafe {
            RemoveEventHandler(self.handler);
            drop(Box::from_raw(self.sender));
        }
        tracing::info!("Hotkey handler removed");
    }
}

extern "C" fn hotkey_handler(
    _call: EventHandlerCallRef,
    event: EventRef,
    user_data: *mut c_void,
) -> OSStatus {
    if user_data.is_null() {
        return NO_ERR;
    }

    let mut hotkey_id = EventHotKeyID::default();
    let status = unsafe {
        GetEventParameter(
            event,
            EVENT_PARAM_DIRECT_OBJECT,
            TYPE_EVENT_HOTKEY_ID,
            ptr::null_mut(),
            mem::size_of::<EventHotKeyID>(),
            ptr::null_mut(),
            &mut hotkey_id as *mut EventHotKeyID as *mut c_void,
        )
    };
    if status != NO_ERR || hotkey_id.signature != SIGNATURE {
        return status;
    }

    tracing::debug!("Hotkey pressed: {}", hotkey_id.id);
    let sender = unsafe { &*(user_data as *const HotkeySender) };
    if let Err(e) = sender.send(Event::HotkeyPressed { id: hotkey_id.id }) {
        tracing::error!("Failed to send hotkey event: {}", e);
    }
    NO_ERR
}
