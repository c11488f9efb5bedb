// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Utility file for allocating overlay memory from system memory.  On Linux systems,
//! this is done with memfd.

use crate::hwc_gralloc::alloc::canonical_allocation_requirements;
use crate::hwc_gralloc::alloc::AllocationInfo;
use crate::hwc_gralloc::alloc::AllocationRequirements;
use crate::hwc_gralloc::alloc::Allocator;
use crate::hwc_os::SharedMemory;
use crate::hwc_utils::*;

/// A heap backend capable of allocation from system memory.  System memory is never
/// hardware protected.
pub struct SystemHeap(());

impl SystemHeap {
    fn new() -> Self {
        SystemHeap(())
    }

    /// Returns a new `SystemHeap` instance.
    pub fn init() -> HwcResult<Box<dyn Allocator>> {
        Ok(Box::new(SystemHeap::new()))
    }
}

impl Allocator for SystemHeap {
    fn supports_secure(&self) -> bool {
        false
    }

    fn get_allocation_requirements(
        &mut self,
        info: AllocationInfo,
    ) -> HwcResult<AllocationRequirements> {
        canonical_allocation_requirements(info)
    }

    fn allocate(&mut self, reqs: AllocationRequirements) -> HwcResult<HwcHandle> {
        let shm = SharedMemory::new("hwc_overlay", reqs.total_size)?;
        Ok(HwcHandle {
            os_handle: shm.into(),
            handle_type: HWC_MEM_HANDLE_TYPE_SHM,
        })
    }
}
