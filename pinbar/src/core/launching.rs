use super::PinProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorIcon {
    /// Application bundle the icon is taken from.
    pub app_path: String,
    pub template: bool,
}

/// What an anchor control currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorVisual {
    pub title: Option<String>,
    pub icon: Option<AnchorIcon>,
}

impl AnchorVisual {
    pub fn for_profile(profile: &PinProfile) -> Self {
        if profile.use_app_icon {
            Self {
                title: None,
                icon: Some(AnchorIcon {
                    app_path: profile.app_path.clone(),
                    template: profile.use_template_icon,
                }),
            }
        } else {
            Self::text(&profile.display_name)
        }
    }

    pub fn text(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            icon: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.icon.is_none()
    }
}

/// Progress affordance shown on the anchor while a launch or acquisition is in flight.
#[derive(Debug, Default)]
pub struct LaunchingIndicator {
    saved: Option<AnchorVisual>,
    active: bool,
    dots: usize,
}

impl LaunchingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Save `current` and return the first frame. `None` if already active.
    pub fn begin(&mut self, current: AnchorVisual) -> Option<AnchorVisual> {
        if self.active {
            return None;
        }
        self.active = true;
        self.saved = (!current.is_empty()).then_some(current);
        self.dots = 1;
        Some(self.frame())
    }

    /// Advance 1 -> 2 -> 3 -> 1 dots. `None` if inactive.
    pub fn tick(&mut self) -> Option<AnchorVisual> {
        if !self.active {
            return None;
        }
        self.dots = self.dots % 3 + 1;
        Some(self.frame())
    }

    /// Stop and return the visual to restore. `None` if inactive.
    pub fn end(&mut self, display_name: &str) -> Option<AnchorVisual> {
        if !self.active {
            return None;
        }
        self.active = false;
        self.dots = 0;
        Some(
            self.saved
                .take()
                .unwrap_or_else(|| AnchorVisual::text(display_name)),
        )
    }

    /// Replace the visual restored by `end`. Ignored while inactive.
    pub fn update_saved(&mut self, visual: AnchorVisual) {
        if self.active {
            self.saved = Some(visual);
        }
    }

    fn frame(&self) -> AnchorVisual {
        AnchorVisual::text(&"•".repeat(self.dots))
    }
}
