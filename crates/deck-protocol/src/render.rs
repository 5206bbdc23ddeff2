//! Key drawing contract.
use std::mem;

use parking_lot::Mutex;

use crate::DisplayDescriptor;

/// Draws display descriptors onto device keys.
///
/// Implementations compose the icon and caption into the device's native
/// image format. Failures are handled (and logged) by the implementation;
/// the panel engine never sees them.
pub trait Renderer: Send + Sync {
    /// Draw one key.
    fn render_key(&self, key: usize, display: &DisplayDescriptor);

    /// Blank every key.
    fn clear_deck(&self);
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    /// `render_key(key, display)`.
    Key(usize, DisplayDescriptor),
    /// `clear_deck()`.
    Clear,
}

/// Renderer that records calls instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Calls in order.
    ops: Mutex<Vec<RenderOp>>,
}

impl RecordingRenderer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take and reset the recorded calls.
    pub fn take(&self) -> Vec<RenderOp> {
        mem::take(&mut *self.ops.lock())
    }

    /// Snapshot the recorded calls.
    pub fn ops(&self) -> Vec<RenderOp> {
        self.ops.lock().clone()
    }

    /// Keys drawn since the last clear, with their latest descriptor.
    pub fn screen(&self) -> Vec<(usize, DisplayDescriptor)> {
        let ops = self.ops.lock();
        let start = ops
            .iter()
            .rposition(|op| *op == RenderOp::Clear)
            .map_or(0, |i| i + 1);
        let mut keys: Vec<(usize, DisplayDescriptor)> = Vec::new();
        for op in &ops[start..] {
            if let RenderOp::Key(k, d) = op {
                match keys.iter_mut().find(|(i, _)| i == k) {
                    Some(slot) => slot.1 = d.clone(),
                    None => keys.push((*k, d.clone())),
                }
            }
        }
        keys.sort_by_key(|(k, _)| *k);
        keys
    }
}

impl Renderer for RecordingRenderer {
    fn render_key(&self, key: usize, display: &DisplayDescriptor) {
        self.ops.lock().push(RenderOp::Key(key, display.clone()));
    }

    fn clear_deck(&self) {
        self.ops.lock().push(RenderOp::Clear);
    }
}
