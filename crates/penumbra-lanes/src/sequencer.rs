// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The strict pass order of a frame.

use crate::error::SequenceError;

/// The six passes of a frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FramePass {
    /// Depth-only pre-pass.
    DepthPrePass,
    /// Deferred G-buffer fill.
    GeometryPass,
    /// Screen-space ambient occlusion.
    AoPass,
    /// Blur of the ambient occlusion.
    AoBlurPass,
    /// Additive light volumes.
    LightingPass,
    /// Presentation of the selected attachment.
    CompositePass,
}

impl FramePass {
    /// Every pass, in execution order.
    pub const ALL: [FramePass; 6] = [
        FramePass::DepthPrePass,
        FramePass::GeometryPass,
        FramePass::AoPass,
        FramePass::AoBlurPass,
        FramePass::LightingPass,
        FramePass::CompositePass,
    ];

    /// Position in [`FramePass::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Enforces that a frame runs every pass exactly once, in order.
#[derive(Debug, Default)]
pub struct PassSequencer {
    next: usize,
}

impl PassSequencer {
    /// Creates a sequencer at the start of a frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewinds to the first pass.
    pub fn begin_frame(&mut self) {
        self.next = 0;
    }

    /// The pass expected next, `None` once every pass ran.
    pub fn expected(&self) -> Option<FramePass> {
        FramePass::ALL.get(self.next).copied()
    }

    /// Marks `pass` as running. Fails on re-entry or skipping.
    pub fn enter(&mut self, pass: FramePass) -> Result<(), SequenceError> {
        let expected = self.expected();
        if expected != Some(pass) {
            return Err(SequenceError::OutOfOrder {
                expected,
                found: pass,
            });
        }
        log::trace!("Entering {pass:?}");
        self.next += 1;
        Ok(())
    }

    /// Checks that every pass ran.
    pub fn finish(&self) -> Result<(), SequenceError> {
        match self.expected() {
            None => Ok(()),
            Some(missing) => Err(SequenceError::Incomplete { missing }),
        }
    }

    /// Number of passes run so far this frame.
    pub fn completed(&self) -> usize {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let mut seq = PassSequencer::new();
        for pass in FramePass::ALL {
            seq.enter(pass).unwrap();
        }
        assert_eq!(seq.completed(), 6);
        seq.finish().unwrap();
    }

    #[test]
    fn test_skipping_is_rejected() {
        let mut seq = PassSequencer::new();
        seq.enter(FramePass::DepthPrePass).unwrap();
        assert_eq!(
            seq.enter(FramePass::AoPass),
            Err(SequenceError::OutOfOrder {
                expected: Some(FramePass::GeometryPass),
                found: FramePass::AoPass
            })
        );
    }

    #[test]
    fn test_reentry_is_rejected() {
        let mut seq = PassSequencer::new();
        seq.enter(FramePass::DepthPrePass).unwrap();
        assert!(seq.enter(FramePass::DepthPrePass).is_err());

        for pass in &FramePass::ALL[1..] {
            seq.enter(*pass).unwrap();
        }
        assert_eq!(
            seq.enter(FramePass::CompositePass),
            Err(SequenceError::OutOfOrder {
                expected: None,
                found: FramePass::CompositePass
            })
        );
    }

    #[test]
    fn test_incomplete_frame() {
        let mut seq = PassSequencer::new();
        seq.enter(FramePass::DepthPrePass).unwrap();
        assert_eq!(
            seq.finish(),
            Err(SequenceError::Incomplete {
                missing: FramePass::GeometryPass
            })
        );
        seq.begin_frame();
        assert_eq!(seq.expected(), Some(FramePass::DepthPrePass));
    }
}
