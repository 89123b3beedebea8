use core_foundation::{
    array::CFArray,
    base::{CFType, CFTypeID, CFTypeRef, TCFType},
    boolean::CFBoolean,
    declare_TCFType, impl_CFTypeDescription, impl_TCFType,
    runloop::CFRunLoopSourceRef,
    string::{CFString, CFStringRef},
};
use core_graphics::geometry::{CGPoint, CGSize};
use std::ffi::c_void;
use std::ptr;

pub type AXError = i32;
pub const AX_ERROR_SUCCESS: AXError = 0;
pub const AX_ERROR_FAILURE: AXError = -25200;

#[repr(C)]
pub struct __AXUIElement(c_void);
pub type AXUIElementRef = *mut __AXUIElement;

declare_TCFType!(AXUIElement, AXUIElementRef);
impl_TCFType!(AXUIElement, AXUIElementRef, AXUIElementGetTypeID);
impl_CFTypeDescription!(AXUIElement);

// AX elements are immutable handles; the worker thread only reads through them.
unsafe impl Send for AXUIElement {}

#[repr(C)]
pub struct __AXObserver(c_void);
pub type AXObserverRef = *mut __AXObserver;

pub type AXObserverCallback = extern "C" fn(
    observer: AXObserverRef,
    element: AXUIElementRef,
    notification: CFStringRef,
    refcon: *mut c_void,
);

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXUIElementGetTypeID() -> CFTypeID;
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: *const c_void) -> bool;
    fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
    fn AXUIElementCopyAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *mut *mut c_void,
    ) -> AXError;
    fn AXUIElementSetAttributeValue(
        element: AXUIElementRef,
        attribute: CFStringRef,
        value: *const c_void,
    ) -> AXError;
    fn AXUIElementIsAttributeSettable(
        element: AXUIElementRef,
        attribute: CFStringRef,
        settable: *mut u8,
    ) -> AXError;
    fn AXValueCreate(value_type: u32, value: *const c_void) -> *mut c_void;
    fn AXValueGetValue(value: *const c_void, value_type: u32, value_ptr: *mut c_void) -> bool;

    fn AXObserverCreate(
        pid: i32,
        callback: AXObserverCallback,
        observer: *mut AXObserverRef,
    ) -> AXError;
    fn AXObserverAddNotification(
        observer: AXObserverRef,
        element: AXUIElementRef,
        notification: CFStringRef,
        refcon: *mut c_void,
    ) -> AXError;
    fn AXObserverRemoveNotification(
        observer: AXObserverRef,
        element: AXUIElementRef,
        notification: CFStringRef,
    ) -> AXError;
    fn AXObserverGetRunLoopSource(observer: AXObserverRef) -> CFRunLoopSourceRef;
}

const AX_VALUE_TYPE_CGPOINT: u32 = 1;
const AX_VALUE_TYPE_CGSIZE: u32 = 2;

pub mod attr {
    pub const WINDOWS: &str = "AXWindows";
    pub const FOCUSED_WINDOW: &str = "AXFocusedWindow";
    pub const MAIN_WINDOW: &str = "AXMainWindow";
    pub const TITLE: &str = "AXTitle";
    pub const ROLE: &str = "AXRole";
    pub const SUBROLE: &str = "AXSubrole";
    pub const POSITION: &str = "AXPosition";
    pub const SIZE: &str = "AXSize";
    pub const MINIMIZED: &str = "AXMinimized";
}

pub mod notification {
    pub const WINDOW_RESIZED: &str = "AXWindowResized";
}

pub fn is_trusted() -> bool {
    unsafe { AXIsProcessTrusted() }
}

pub fn is_trusted_with_prompt() -> bool {
    use core_foundation::dictionary::CFDictionary;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let dict = CFDictionary::from_CFType_pairs(&[(key, CFBoolean::true_value())]);

    unsafe { AXIsProcessTrustedWithOptions(dict.as_concrete_TypeRef() as *const c_void) }
}

impl AXUIElement {
    pub fn application(pid: i32) -> Self {
        unsafe {
            let raw = AXUIElementCreateApplication(pid);
            Self::wrap_under_create_rule(raw)
        }
    }

    /// Copied attribute value, released when dropped.
    fn get_attribute(&self, name: &str) -> Result<CFType, AXError> {
        let attr = CFString::new(name);
        let mut value: *mut c_void = ptr::null_mut();
        let err = unsafe {
            AXUIElementCopyAttributeValue(
                self.as_concrete_TypeRef(),
                attr.as_concrete_TypeRef(),
                &mut value,
            )
        };
        if err == AX_ERROR_SUCCESS && !value.is_null() {
            Ok(unsafe { CFType::wrap_under_create_rule(value as CFTypeRef) })
        } else {
            Err(err)
        }
    }

    fn set_attribute(&self, name: &str, value: &CFType) -> Result<(), AXError> {
        let attr = CFString::new(name);
        let err = unsafe {
            AXUIElementSetAttributeValue(
                self.as_concrete_TypeRef(),
                attr.as_concrete_TypeRef(),
                value.as_CFTypeRef(),
            )
        };
        if err == AX_ERROR_SUCCESS {
            Ok(())
        } else {
            Err(err)
        }
    }

    fn string_attribute(&self, name: &str) -> Result<String, AXError> {
        let value = self.get_attribute(name)?;
        value
            .downcast::<CFString>()
            .map(|s| s.to_string())
            .ok_or(AX_ERROR_FAILURE)
    }

    fn element_attribute(&self, name: &str) -> Result<AXUIElement, AXError> {
        let value = self.get_attribute(name)?;
        Ok(unsafe { AXUIElement::wrap_under_get_rule(value.as_CFTypeRef() as AXUIElementRef) })
    }

    pub fn is_attribute_settable(&self, name: &str) -> Result<bool, AXError> {
        let attr = CFString::new(name);
        let mut settable: u8 = 0;
        let err = unsafe {
            AXUIElementIsAttributeSettable(
                self.as_concrete_TypeRef(),
                attr.as_concrete_TypeRef(),
                &mut settable,
            )
        };
        if err == AX_ERROR_SUCCESS {
            Ok(settable != 0)
        } else {
            Err(err)
        }
    }

    pub fn title(&self) -> Result<String, AXError> {
        self.string_attribute(attr::TITLE)
    }

    pub fn role(&self) -> Result<String, AXError> {
        self.string_attribute(attr::ROLE)
    }

    pub fn subrole(&self) -> Result<String, AXError> {
        self.string_attribute(attr::SUBROLE)
    }

    pub fn position(&self) -> Result<CGPoint, AXError> {
        let value = self.get_attribute(attr::POSITION)?;
        let mut point = CGPoint::new(0.0, 0.0);
        let ok = unsafe {
            AXValueGetValue(
                value.as_CFTypeRef(),
                AX_VALUE_TYPE_CGPOINT,
                &mut point as *mut CGPoint as *mut c_void,
            )
        };
        if ok {
            Ok(point)
        } else {
            Err(AX_ERROR_FAILURE)
        }
    }

    pub fn size(&self) -> Result<CGSize, AXError> {
        let value = self.get_attribute(attr::SIZE)?;
        let mut size = CGSize::new(0.0, 0.0);
        let ok = unsafe {
            AXValueGetValue(
                value.as_CFTypeRef(),
                AX_VALUE_TYPE_CGSIZE,
                &mut size as *mut CGSize as *mut c_void,
            )
        };
        if ok {
            Ok(size)
        } else {
            Err(AX_ERROR_FAILURE)
        }
    }

    pub fn set_position(&self, point: CGPoint) -> Result<(), AXError> {
        let raw = unsafe {
            AXValueCreate(
                AX_VALUE_TYPE_CGPOINT,
                &point as *const CGPoint as *const c_void,
            )
        };
        if raw.is_null() {
            return Err(AX_ERROR_FAILURE);
        }
        let value = unsafe { CFType::wrap_under_create_rule(raw as CFTypeRef) };
        self.set_attribute(attr::POSITION, &value)
    }

    pub fn set_size(&self, size: CGSize) -> Result<(), AXError> {
        let raw = unsafe {
            AXValueCreate(
                AX_VALUE_TYPE_CGSIZE,
                &size as *const CGSize as *const c_void,
            )
        };
        if raw.is_null() {
            return Err(AX_ERROR_FAILURE);
        }
        let value = unsafe { CFType::wrap_under_create_rule(raw as CFTypeRef) };
        self.set_attribute(attr::SIZE, &value)
    }

    pub fn is_minimized(&self) -> Result<bool, AXError> {
        let value = self.get_attribute(attr::MINIMIZED)?;
        value
            .downcast::<CFBoolean>()
            .map(bool::from)
            .ok_or(AX_ERROR_FAILURE)
    }

    pub fn windows(&self) -> Result<Vec<AXUIElement>, AXError> {
        let value = self.get_attribute(attr::WINDOWS)?;
        let arr: CFArray =
            unsafe { CFArray::wrap_under_get_rule(value.as_CFTypeRef() as *const _) };
        let mut result = Vec::with_capacity(arr.len() as usize);
        for i in 0..arr.len() {
            let elem = unsafe {
                let ptr = *arr.get_unchecked(i);
                AXUIElement::wrap_under_get_rule(ptr as AXUIElementRef)
            };
            result.push(elem);
        }
        Ok(result)
    }

    pub fn focused_window(&self) -> Result<AXUIElement, AXError> {
        self.element_attribute(attr::FOCUSED_WINDOW)
    }

    pub fn main_window(&self) -> Result<AXUIElement, AXError> {
        self.element_attribute(attr::MAIN_WINDOW)
    }
}

/// Owned `AXObserverRef` for one process.
pub struct AXObserver {
    raw: AXObserverRef,
}

impl AXObserver {
    pub fn new(pid: i32, callback: AXObserverCallback) -> Result<Self, AXError> {
        let mut raw: AXObserverRef = ptr::null_mut();
        let err = unsafe { AXObserverCreate(pid, callback, &mut raw) };
        if err != AX_ERROR_SUCCESS || raw.is_null() {
            return Err(err);
        }
        Ok(Self { raw })
    }

    pub fn add_notification(
        &self,
        element: &AXUIElement,
        notification: &str,
        refcon: *mut c_void,
    ) -> Result<(), AXError> {
        let name = CFString::new(notification);
        let err = unsafe {
            AXObserverAddNotification(
                self.raw,
                element.as_concrete_TypeRef(),
                name.as_concrete_TypeRef(),
                refcon,
            )
        };
        if err == AX_ERROR_SUCCESS {
            Ok(())
        } else {
            Err(err)
        }
    }

    pub fn remove_notification(&self, element: &AXUIElement, notification: &str) {
        let name = CFString::new(notification);
        unsafe {
            AXObserverRemoveNotification(
                self.raw,
                element.as_concrete_TypeRef(),
                name.as_concrete_TypeRef(),
            );
        }
    }

    pub fn run_loop_source(&self) -> CFRunLoopSourceRef {
        unsafe { AXObserverGetRunLoopSource(self.raw) }
    }
}

impl Drop for AXObserver {
    fn drop(&mut self) {
        unsafe { core_foundation::base::CFRelease(self.raw as CFTypeRef) };
    }
}
