// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#![cfg(feature = "ion")]

//! ion: dma-buf backed overlay allocation through the ion device.

use std::fs::File;
use std::fs::OpenOptions;
use std::os::unix::io::AsRawFd;

use crate::hwc_gralloc::alloc::canonical_allocation_requirements;
use crate::hwc_gralloc::alloc::AllocationInfo;
use crate::hwc_gralloc::alloc::AllocationRequirements;
use crate::hwc_gralloc::alloc::Allocator;
use crate::hwc_gralloc::ion_bindings::*;
use crate::hwc_os::FromRawDescriptor;
use crate::hwc_os::RawDescriptor;
use crate::hwc_os::SafeDescriptor;
use crate::hwc_utils::*;

/// A heap backend allocating dma-buf descriptors through the ion device.  Protected
/// requests come from the multimedia heap with the secure flag set; everything else
/// comes from the system heap.
pub struct IonHeap {
    device: File,
}

impl IonHeap {
    /// Returns a new `IonHeap` instance if the ion device can be opened.
    pub fn init() -> HwcResult<Box<dyn Allocator>> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(ION_DEVICE_PATH)?;
        Ok(Box::new(IonHeap { device }))
    }
}

impl Allocator for IonHeap {
    fn supports_secure(&self) -> bool {
        true
    }

    fn get_allocation_requirements(
        &mut self,
        info: AllocationInfo,
    ) -> HwcResult<AllocationRequirements> {
        canonical_allocation_requirements(info)
    }

    fn allocate(&mut self, reqs: AllocationRequirements) -> HwcResult<HwcHandle> {
        let protected = reqs.info.flags.protected();

        let mut flags: u32 = 0;
        if reqs.map_info & HWC_MAP_CACHE_MASK == HWC_MAP_CACHE_CACHED {
            flags |= ION_FLAG_CACHED;
        }
        if protected {
            flags |= ION_FLAG_SECURE;
        }

        let mut data = ion_allocation_data {
            len: reqs.total_size,
            heap_id_mask: if protected {
                1 << ION_CP_MM_HEAP_ID
            } else {
                1 << ION_SYSTEM_HEAP_ID
            },
            flags,
            fd: 0,
            unused: 0,
        };

        // Safe because we own the ion device and the kernel only writes back into `data`.
        unsafe {
            ion_alloc(self.device.as_raw_fd(), &mut data)?;
        }

        // Safe because the kernel just handed this descriptor to us and nothing else has
        // access to it.
        let os_handle =
            unsafe { SafeDescriptor::from_raw_descriptor(data.fd as RawDescriptor) };

        Ok(HwcHandle {
            os_handle,
            handle_type: HWC_MEM_HANDLE_TYPE_DMABUF,
        })
    }
}
