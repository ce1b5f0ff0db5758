use crate::config::MonitorTarget;
use crate::geometry::Rect;
use log::debug;
use std::fmt::Display;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorRect {
    pub name: String,
    pub area: Rect,
}

/// Read access to the screen layout and to the window-manager/input state
/// needed to locate the active monitor.
pub trait MonitorSource {
    type Error: Display;

    /// The virtual desktop spanning every monitor.
    fn combined(&self) -> Rect;

    fn monitors(&self) -> Result<Vec<MonitorRect>, Self::Error>;

    /// Center of the focused window in root coordinates, if any window has
    /// the focus.
    fn focus_point(&self) -> Result<Option<(i32, i32)>, Self::Error>;

    fn pointer_point(&self) -> Result<(i32, i32), Self::Error>;
}

/// Rectangle of the monitor `target` designates. Anything that cannot be
/// resolved falls back to the combined screen.
pub fn resolve_monitor<S: MonitorSource>(source: &S, target: &MonitorTarget) -> Rect {
    let found = match target {
        MonitorTarget::Combined => None,
        MonitorTarget::Named(name) => find_named(source, name),
        MonitorTarget::RelativeFocus => match source.focus_point() {
            Ok(Some((x, y))) => monitor_at(source, x, y),
            Ok(None) => {
                debug!("no focused window");
                None
            }
            Err(e) => {
                debug!("failed to query the input focus: {}", e);
                None
            }
        },
        MonitorTarget::RelativePointer => match source.pointer_point() {
            Ok((x, y)) => monitor_at(source, x, y),
            Err(e) => {
                debug!("failed to query the pointer: {}", e);
                None
            }
        },
    };
    found.unwrap_or_else(|| source.combined())
}

fn list_monitors<S: MonitorSource>(source: &S) -> Vec<MonitorRect> {
    match source.monitors() {
        Ok(monitors) => monitors,
        Err(e) => {
            debug!("monitor enumeration failed: {}", e);
            Vec::new()
        }
    }
}

fn find_named<S: MonitorSource>(source: &S, name: &str) -> Option<Rect> {
    let found = list_monitors(source)
        .into_iter()
        .find(|m| m.name == name)
        .map(|m| m.area);
    if found.is_none() {
        debug!("no monitor named {name}, using the combined screen");
    }
    found
}

fn monitor_at<S: MonitorSource>(source: &S, x: i32, y: i32) -> Option<Rect> {
    list_monitors(source)
        .into_iter()
        .find(|m| m.area.contains(x, y))
        .map(|m| m.area)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeScreen {
        monitors: Option<Vec<MonitorRect>>,
        focus: Option<(i32, i32)>,
        pointer: (i32, i32),
    }

    impl FakeScreen {
        fn dual() -> Self {
            Self {
                monitors: Some(vec![
                    MonitorRect {
                        name: "eDP-1".into(),
                        area: Rect::new(0, 0, 1920, 1080),
                    },
                    MonitorRect {
                        name: "HDMI-1".into(),
                        area: Rect::new(1920, 0, 2560, 1440),
                    },
                ]),
                focus: Some((2500, 700)),
                pointer: (10, 10),
            }
        }
    }

    impl MonitorSource for FakeScreen {
        type Error = &'static str;

        fn combined(&self) -> Rect {
            Rect::new(0, 0, 4480, 1440)
        }

        fn monitors(&self) -> Result<Vec<MonitorRect>, Self::Error> {
            self.monitors.clone().ok_or("no randr")
        }

        fn focus_point(&self) -> Result<Option<(i32, i32)>, Self::Error> {
            Ok(self.focus)
        }

        fn pointer_point(&self) -> Result<(i32, i32), Self::Error> {
            Ok(self.pointer)
        }
    }

    #[test]
    fn named_monitor_resolves_to_its_area() {
        let screen = FakeScreen::dual();
        let target = MonitorTarget::Named("HDMI-1".into());
        assert_eq!(resolve_monitor(&screen, &target), Rect::new(1920, 0, 2560, 1440));
    }

    #[test]
    fn unknown_monitor_falls_back_to_combined() {
        let screen = FakeScreen::dual();
        let target = MonitorTarget::Named("DP-7".into());
        assert_eq!(resolve_monitor(&screen, &target), screen.combined());
    }

    #[test]
    fn failed_enumeration_falls_back_to_combined() {
        let screen = FakeScreen {
            monitors: None,
            ..FakeScreen::dual()
        };
        for target in [
            MonitorTarget::Named("eDP-1".into()),
            MonitorTarget::RelativeFocus,
            MonitorTarget::RelativePointer,
        ] {
            assert_eq!(resolve_monitor(&screen, &target), screen.combined());
        }
    }

    #[test]
    fn relative_modes_follow_focus_and_pointer() {
        let screen = FakeScreen::dual();
        assert_eq!(
            resolve_monitor(&screen, &MonitorTarget::RelativeFocus),
            Rect::new(1920, 0, 2560, 1440)
        );
        assert_eq!(
            resolve_monitor(&screen, &MonitorTarget::RelativePointer),
            Rect::new(0, 0, 1920, 1080)
        );
    }

    #[test]
    fn points_outside_every_monitor_use_combined() {
        let screen = FakeScreen {
            focus: None,
            pointer: (100, 1200),
            ..FakeScreen::dual()
        };
        assert_eq!(resolve_monitor(&screen, &MonitorTarget::RelativeFocus), screen.combined());
        assert_eq!(resolve_monitor(&screen, &MonitorTarget::RelativePointer), screen.combined());
    }
}
