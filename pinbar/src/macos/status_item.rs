use std::sync::mpsc as std_mpsc;

use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{define_class, msg_send, sel, DefinedClass, MainThreadMarker, MainThreadOnly};
use objc2_app_kit::{NSStatusBar, NSStatusItem, NSWorkspace};
use objc2_foundation::{NSObject, NSObjectProtocol, NSSize, NSString};

use crate::core::{AnchorVisual, PinProfile, ProfileId, Rect};
use crate::event::Event;
use crate::macos::AXUIElement;
use crate::platform::{Anchor, AnchorFactory};

const VARIABLE_LENGTH: f64 = -1.0;
const ICON_SIZE: f64 = 18.0;

struct TargetIvars {
    profile_id: ProfileId,
    event_tx: std_mpsc::Sender<Event<AXUIElement>>,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "PinbarAnchorTarget"]
    #[ivars = TargetIvars]
    struct AnchorTarget;

    unsafe impl NSObjectProtocol for AnchorTarget {}

    impl AnchorTarget {
        #[unsafe(method(clicked:))]
        fn clicked(&self, _sender: &AnyObject) {
            let ivars = self.ivars();
            tracing::debug!("Anchor clicked: {}", ivars.profile_id);
            let event = Event::AnchorClicked {
                profile_id: ivars.profile_id.clone(),
            };
            if let Err(e) = ivars.event_tx.send(event) {
                tracing::error!("Failed to send click event: {}", e);
            }
        }
    }
);

impl AnchorTarget {
    fn new(
        profile_id: ProfileId,
        event_tx: std_mpsc::Sender<Event<AXUIElement>>,
        mtm: MainThreadMarker,
    ) -> Retained<Self> {
        let this = mtm.alloc::<Self>();
        let this = this.set_ivars(TargetIvars {
            profile_id,
            event_tx,
        });
        unsafe { msg_send![super(this), init] }
    }
}

/// A menu bar status item standing in for one pinned application.
pub struct StatusItemAnchor {
    mtm: MainThreadMarker,
    item: Retained<NSStatusItem>,
    _target: Retained<AnchorTarget>,
    visual: AnchorVisual,
}

impl StatusItemAnchor {
    pub fn new(
        profile: &PinProfile,
        event_tx: std_mpsc::Sender<Event<AXUIElement>>,
        mtm: MainThreadMarker,
    ) -> Self {
        let item = NSStatusBar::systemStatusBar().statusItemWithLength(VARIABLE_LENGTH);
        let target = AnchorTarget::new(profile.id.clone(), event_tx, mtm);

        if let Some(button) = item.button(mtm) {
            let target_obj: &AnyObject = &target;
            unsafe {
                button.setTarget(Some(target_obj));
                button.setAction(Some(sel!(clicked:)));
            }
        }

        tracing::debug!("Created status item for {}", profile.display_name);
        Self {
            mtm,
            item,
            _target: target,
            visual: AnchorVisual::default(),
        }
    }

    fn apply(&self) {
        let Some(button) = self.item.button(self.mtm) else {
            return;
        };

        match &self.visual.icon {
            Some(icon) => {
                let workspace = NSWorkspace::sharedWorkspace();
                let image = workspace.iconForFile(&NSString::from_str(&icon.app_path));
                image.setSize(NSSize::new(ICON_SIZE, ICON_SIZE));
                image.setTemplate(icon.template);
                button.setImage(Some(&*image));
                button.setTitle(&NSString::from_str(""));
            }
            None => {
                button.setImage(None);
                let title = self.visual.title.as_deref().unwrap_or("");
                button.setTitle(&NSString::from_str(title));
            }
        }
    }
}

impl Anchor for StatusItemAnchor {
    fn frame(&self) -> Option<Rect> {
        let button = self.item.button(self.mtm)?;
        let window = button.window()?;
        let r = window.frame();
        Some(Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height))
    }

    fn visual(&self) -> AnchorVisual {
        self.visual.clone()
    }

    fn set_visual(&mut self, visual: &AnchorVisual) {
        if self.visual == *visual {
            return;
        }
        self.visual = visual.clone();
        self.apply();
    }
}

impl Drop for StatusItemAnchor {
    fn drop(&mut self) {
        NSStatusBar::systemStatusBar().removeStatusItem(&self.item);
    }
}

pub struct StatusItemFactory {
    mtm: MainThreadMarker,
    event_tx: std_mpsc::Sender<Event<AXUIElement>>,
}

impl StatusItemFactory {
    pub fn new(event_tx: std_mpsc::Sender<Event<AXUIElement>>, mtm: MainThreadMarker) -> Self {
        Self { mtm, event_tx }
    }
}

impl AnchorFactory for StatusItemFactory {
    fn create(&self, profile: &PinProfile) -> Box<dyn Anchor> {
        Box::new(StatusItemAnchor::new(profile, self.event_tx.clone(), self.mtm))
    }
}
