//! Built-in button types.
use std::{
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use deck_protocol::{Color, DisplayDescriptor, icons};
use eventbus::{Payload, Topic};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{Behavior, Catalog, ItemCtx};

/// Register the built-in button types.
pub fn register(c: &mut Catalog) {
    c.register_button("button", |spec| {
        Ok(Box::new(Label::new(spec.params()?)))
    });
    c.register_button("launch", |spec| {
        let params: LaunchParams = spec.params()?;
        Ok(Box::new(Launch { params }))
    });
    c.register_button("toggle", |spec| {
        let params: ToggleParams = spec.params()?;
        Ok(Box::new(Toggle {
            on: params.on,
            params,
        }))
    });
    c.register_button("countdown", |spec| {
        let params: CountdownParams = spec.params()?;
        Ok(Box::new(Countdown::new(params)))
    });
}

/// Caption and icons shared by the built-ins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Face {
    /// Caption; defaults to the item name.
    #[serde(default)]
    pub label: Option<String>,
    /// Icon at rest.
    #[serde(default)]
    pub icon: Option<String>,
    /// Icon while pressed.
    #[serde(default)]
    pub icon_pressed: Option<String>,
}

impl Face {
    /// Descriptor for the resting or pressed state.
    fn display(&self, ctx: &ItemCtx<'_>, pressed: bool) -> DisplayDescriptor {
        let icon = if pressed {
            self.icon_pressed
                .as_deref()
                .map_or_else(|| icons::DEFAULT_PRESSED.to_string(), |i| ctx.icon(i))
        } else {
            self.icon
                .as_deref()
                .map_or_else(|| icons::DEFAULT.to_string(), |i| ctx.icon(i))
        };
        DisplayDescriptor::new(self.label.as_deref().unwrap_or(ctx.name)).with_icon(icon)
    }
}

/// Plain button: shows its caption, swaps icons while held.
pub struct Label {
    /// Appearance.
    face: Face,
}

impl Label {
    /// Label with the given appearance.
    pub fn new(face: Face) -> Self {
        Self { face }
    }
}

impl Behavior for Label {
    fn render(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(self.face.display(ctx, false))
    }

    fn press(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(self.face.display(ctx, true))
    }
}

/// Parameters of a `launch` button.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchParams {
    /// Program to run.
    pub command: String,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Appearance.
    #[serde(flatten)]
    pub face: Face,
}

/// Runs a program, detached, when released.
pub struct Launch {
    /// Parameters.
    params: LaunchParams,
}

impl Behavior for Launch {
    fn render(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(self.params.face.display(ctx, false))
    }

    fn press(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(self.params.face.display(ctx, true))
    }

    fn release(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        let spawned = Command::new(&self.params.command)
            .args(&self.params.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                info!(item = ctx.name, command = %self.params.command, pid = child.id(), "launched");
                reap(child, self.params.command.clone());
                Some(self.params.face.display(ctx, false))
            }
            Err(e) => {
                error!(item = ctx.name, command = %self.params.command, error = %e, "launch failed");
                Some(self.params.face.display(ctx, false).with_color(Color::RED))
            }
        }
    }
}

/// Wait for a launched program on its own thread so it never lingers as a
/// zombie.
fn reap(mut child: Child, command: String) {
    let pid = child.id();
    let waiter = thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => debug!(%command, pid, %status, "launched program exited"),
            Err(e) => warn!(%command, pid, error = %e, "wait on launched program failed"),
        });
    if let Err(e) = waiter {
        warn!(pid, error = %e, "could not start reaper thread");
    }
}

/// Parameters of a `toggle` button.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToggleParams {
    /// Initial state.
    #[serde(default)]
    pub on: bool,
    /// Icon while on.
    #[serde(default)]
    pub icon_on: Option<String>,
    /// Icon while off.
    #[serde(default)]
    pub icon_off: Option<String>,
    /// Caption while on.
    #[serde(default)]
    pub label_on: Option<String>,
    /// Caption while off.
    #[serde(default)]
    pub label_off: Option<String>,
}

/// Flips an on/off state on release.
///
/// Each flip publishes `toggle_changed` with `[name, on]`.
pub struct Toggle {
    /// Current state.
    on: bool,
    /// Parameters.
    params: ToggleParams,
}

impl Toggle {
    /// Descriptor for the current state.
    fn display(&self, ctx: &ItemCtx<'_>) -> DisplayDescriptor {
        let p = &self.params;
        let (icon, label) = if self.on {
            (p.icon_on.as_deref(), p.label_on.as_deref())
        } else {
            (p.icon_off.as_deref(), p.label_off.as_deref())
        };
        let fallback = if self.on {
            icons::DEFAULT_PRESSED
        } else {
            icons::DEFAULT
        };
        DisplayDescriptor::new(label.unwrap_or(ctx.name))
            .with_icon(icon.map_or_else(|| fallback.to_string(), |i| ctx.icon(i)))
    }
}

impl Behavior for Toggle {
    fn render(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(self.display(ctx))
    }

    fn press(&mut self, _ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        None
    }

    fn release(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        self.on = !self.on;
        debug!(item = ctx.name, on = self.on, "toggled");
        ctx.publish(
            Topic::Custom("toggle_changed".into()),
            Payload::args([json!(ctx.name), json!(self.on)]),
        );
        Some(self.display(ctx))
    }
}

/// Parameters of a `countdown` button.
#[derive(Debug, Clone, Deserialize)]
pub struct CountdownParams {
    /// Length of the countdown in seconds.
    pub seconds: u64,
    /// Caption shown at rest; defaults to the item name.
    #[serde(default)]
    pub label: Option<String>,
    /// Caption shown once the countdown reaches zero.
    #[serde(default = "default_done_label")]
    pub done_label: String,
}

/// Default caption for a finished countdown.
fn default_done_label() -> String {
    "Done".to_string()
}

/// Countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not started, or paused with time left.
    Idle(Duration),
    /// Running until the deadline.
    Running(Instant),
    /// Reached zero.
    Done,
}

/// A timer started and paused by releasing the key.
///
/// While running, every visible tick redraws the remaining `MM:SS`.
pub struct Countdown {
    /// Parameters.
    params: CountdownParams,
    /// Current phase.
    phase: Phase,
}

impl Countdown {
    /// A fresh, idle countdown.
    pub fn new(params: CountdownParams) -> Self {
        let phase = Phase::Idle(Duration::from_secs(params.seconds));
        Self { params, phase }
    }

    /// Time left.
    fn remaining(&self) -> Duration {
        match self.phase {
            Phase::Idle(left) => left,
            Phase::Running(deadline) => deadline.saturating_duration_since(Instant::now()),
            Phase::Done => Duration::ZERO,
        }
    }

    /// Descriptor for the current phase.
    fn display(&self, ctx: &ItemCtx<'_>) -> DisplayDescriptor {
        match self.phase {
            Phase::Done => DisplayDescriptor::new(self.params.done_label.as_str())
                .with_icon(icons::DEFAULT)
                .with_color(Color::RED),
            Phase::Running(_) => {
                DisplayDescriptor::new(format_mmss(self.remaining())).with_icon(icons::DEFAULT_PRESSED)
            }
            Phase::Idle(left) if left.as_secs() == self.params.seconds => {
                DisplayDescriptor::new(self.params.label.as_deref().unwrap_or(ctx.name)).with_icon(icons::DEFAULT)
            }
            Phase::Idle(left) => DisplayDescriptor::new(format_mmss(left)).with_icon(icons::DEFAULT),
        }
    }
}

impl Behavior for Countdown {
    fn render(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        Some(self.display(ctx))
    }

    fn press(&mut self, _ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        None
    }

    fn release(&mut self, ctx: &ItemCtx<'_>) -> Option<DisplayDescriptor> {
        self.phase = match self.phase {
            Phase::Idle(left) => Phase::Running(Instant::now() + left),
            Phase::Running(_) => Phase::Idle(self.remaining()),
            Phase::Done => Phase::Idle(Duration::from_secs(self.params.seconds)),
        };
        debug!(item = ctx.name, phase = ?self.phase, "countdown");
        Some(self.display(ctx))
    }

    fn tick(&mut self, ctx: &ItemCtx<'_>, _index: u64, _count: u64) -> Option<DisplayDescriptor> {
        if !matches!(self.phase, Phase::Running(_)) {
            return None;
        }
        if self.remaining().is_zero() {
            info!(item = ctx.name, "countdown finished");
            self.phase = Phase::Done;
        }
        Some(self.display(ctx))
    }
}

/// `MM:SS`, rounding partial seconds up.
pub fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use eventbus::EventBus;

    use super::*;
    use crate::{ItemSpec, Outbox};

    fn build(kind: &str, params: serde_json::Value) -> Box<dyn Behavior> {
        let serde_json::Value::Object(map) = params else {
            panic!("params must be an object");
        };
        let spec = ItemSpec {
            name: "item",
            path: None,
            params: &map,
        };
        Catalog::with_builtins().button(kind, &spec).unwrap()
    }

    fn ctx<'a>(outbox: &'a Outbox, bus: &EventBus) -> ItemCtx<'a> {
        ItemCtx {
            name: "item",
            path: None,
            id: bus.register("item"),
            key: Some(0),
            outbox,
        }
    }

    #[test]
    fn mmss() {
        assert_eq!(format_mmss(Duration::from_secs(90)), "01:30");
        assert_eq!(format_mmss(Duration::from_millis(89_001)), "01:30");
        assert_eq!(format_mmss(Duration::ZERO), "00:00");
    }

    #[test]
    fn label_swaps_icons() {
        let mut b = build("button", json!({"label": "Hi"}));
        let out = Outbox::default();
        let bus = EventBus::new();
        let c = ctx(&out, &bus);
        let rest = b.render(&c).unwrap();
        assert_eq!(rest.text, "Hi");
        assert_eq!(rest.icon.as_deref(), Some(icons::DEFAULT));
        assert_eq!(b.press(&c).unwrap().icon.as_deref(), Some(icons::DEFAULT_PRESSED));
        assert_eq!(b.release(&c).unwrap(), rest);
    }

    #[test]
    fn toggle_flips_and_publishes() {
        let mut t = build("toggle", json!({"label_on": "On", "label_off": "Off"}));
        let out = Outbox::default();
        let bus = EventBus::new();
        let c = ctx(&out, &bus);
        assert_eq!(t.render(&c).unwrap().text, "Off");
        assert!(t.press(&c).is_none());
        assert_eq!(t.release(&c).unwrap().text, "On");
        assert_eq!(t.release(&c).unwrap().text, "Off");
        let sent = out.drain();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].topic(), &Topic::Custom("toggle_changed".into()));
    }

    #[test]
    fn countdown_runs_to_done() {
        let mut cd = build("countdown", json!({"seconds": 90}));
        let out = Outbox::default();
        let bus = EventBus::new();
        let c = ctx(&out, &bus);
        assert_eq!(cd.render(&c).unwrap().text, "item");
        assert!(cd.tick(&c, 0, 0).is_none());
        assert_eq!(cd.release(&c).unwrap().text, "01:30");
        assert_eq!(cd.tick(&c, 1, 1).unwrap().text, "01:30");

        let mut zero = build("countdown", json!({"seconds": 0, "done_label": "Tea!"}));
        let _ = zero.release(&c);
        assert_eq!(zero.tick(&c, 1, 1).unwrap().text, "Tea!");
        assert!(zero.tick(&c, 2, 2).is_none());
    }

    #[test]
    fn launch_failure_is_reported_on_key() {
        let mut l = build("launch", json!({"command": "/nonexistent/deckpilot-test-binary"}));
        let out = Outbox::default();
        let bus = EventBus::new();
        let c = ctx(&out, &bus);
        let d = l.release(&c).unwrap();
        assert_eq!(d.color, Color::RED);
    }

    /// Zombie processes whose parent is this test process.
    #[cfg(target_os = "linux")]
    fn zombie_children() -> usize {
        use std::{fs, process};

        let me = process::id().to_string();
        fs::read_dir("/proc")
            .unwrap()
            .filter_map(|e| fs::read_to_string(e.ok()?.path().join("stat")).ok())
            .filter(|stat| {
                let Some((_, rest)) = stat.rsplit_once(')') else {
                    return false;
                };
                let mut fields = rest.split_whitespace();
                fields.next() == Some("Z") && fields.next() == Some(me.as_str())
            })
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn launched_programs_are_reaped() {
        let mut l = build("launch", json!({"command": "true"}));
        let out = Outbox::default();
        let bus = EventBus::new();
        let c = ctx(&out, &bus);
        let d = l.release(&c).unwrap();
        assert_ne!(d.color, Color::RED);
        let deadline = Instant::now() + Duration::from_secs(5);
        while zombie_children() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(zombie_children(), 0);
    }
}
