// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! fence: Owned synchronization tokens and the release-fence FIFO.
//!
//! Fences cross into the kernel/GPU domains as raw descriptors, but inside the adapter
//! they are owned values: a fence given to a layer is closed exactly once, either by
//! being transferred back out or when its owner drops.

use crate::hwc_os::AsRawDescriptor;
use crate::hwc_os::FromRawDescriptor;
use crate::hwc_os::IntoRawDescriptor;
use crate::hwc_os::RawDescriptor;
use crate::hwc_os::SafeDescriptor;
use crate::hwc_utils::HwcError;
use crate::hwc_utils::HwcResult;

/// An owned sync-fence descriptor, signaled when the GPU or display hardware is done
/// with a buffer.
pub struct SyncFence(SafeDescriptor);

impl SyncFence {
    /// Takes ownership of a raw fence descriptor from the host.
    ///
    /// A negative descriptor is the host's "no fence" signal and yields `None`.  Zero is
    /// never a valid fence and is rejected so a corrupted call cannot make the adapter
    /// close descriptor 0.
    pub fn from_raw(fence: RawDescriptor) -> HwcResult<Option<SyncFence>> {
        if fence == 0 {
            return Err(HwcError::InvalidFence);
        }
        if fence < 0 {
            return Ok(None);
        }
        // Safe because the host transfers ownership of the descriptor with the call.
        Ok(Some(SyncFence(unsafe {
            SafeDescriptor::from_raw_descriptor(fence)
        })))
    }

    /// Transfers ownership of the descriptor back out, e.g. to hand a release fence to
    /// the host.
    pub fn into_raw(self) -> RawDescriptor {
        self.0.into_raw_descriptor()
    }
}

impl AsRawDescriptor for SyncFence {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.0.as_raw_descriptor()
    }
}

impl From<SafeDescriptor> for SyncFence {
    fn from(descriptor: SafeDescriptor) -> SyncFence {
        SyncFence(descriptor)
    }
}

/// A FIFO of release fences, one entry per presentation cycle.  `None` entries mean the
/// cycle produced no fence.
///
/// Pushing transfers ownership in; popping transfers it out.  Everything still queued
/// when the queue drops is closed there, so a destroyed layer cannot leak descriptors.
#[derive(Default)]
pub struct ReleaseFenceQueue {
    fences: std::collections::VecDeque<Option<SyncFence>>,
}

impl ReleaseFenceQueue {
    pub fn new() -> ReleaseFenceQueue {
        Default::default()
    }

    /// Queues the fence for the next presentation cycle.
    pub fn push(&mut self, fence: Option<SyncFence>) {
        self.fences.push_back(fence);
    }

    /// Transfers the oldest fence out.  An empty queue yields `None`, the "no fence"
    /// signal.
    pub fn pop(&mut self) -> Option<SyncFence> {
        self.fences.pop_front().flatten()
    }

    pub fn len(&self) -> usize {
        self.fences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }
}
