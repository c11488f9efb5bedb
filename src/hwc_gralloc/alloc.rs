// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! alloc: Heap-backend agnostic allocation of overlay buffers.

use std::collections::BTreeMap as Map;

use vmm_sys_util::align_upwards;

use crate::checked_arithmetic;
#[cfg(feature = "ion")]
use crate::hwc_gralloc::ion::IonHeap;
use crate::hwc_gralloc::mdp::MdpControl;
use crate::hwc_gralloc::mdp::SecureBufferControl;
use crate::hwc_gralloc::system_heap::SystemHeap;
use crate::hwc_os::round_up_to_page_size;
use crate::hwc_os::AsRawDescriptor;
use crate::hwc_utils::*;

/*
 * Overlay heap flags are a distillation of the host gralloc usage bits; legacy flags with no
 * consumer in the display pipeline are left out.
 */
const OVERLAY_HEAP_USE_UNCACHED: u32 = 1 << 0;
const OVERLAY_HEAP_USE_PROTECTED: u32 = 1 << 1;
const OVERLAY_HEAP_USE_IOMMU: u32 = 1 << 2;
const OVERLAY_HEAP_USE_MM: u32 = 1 << 3;

/// Secure buffers are carved out of the multimedia heap at 1 MiB granularity.
pub const SIZE_1M: u64 = 1 << 20;

/// Usage flags for constructing an overlay buffer allocation.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct OverlayHeapFlags(pub u32);

impl OverlayHeapFlags {
    /// Returns empty set of flags.
    #[inline(always)]
    pub fn empty() -> OverlayHeapFlags {
        OverlayHeapFlags(0)
    }

    /// Returns the given set of raw `OVERLAY_HEAP` flags wrapped in an OverlayHeapFlags struct.
    #[inline(always)]
    pub fn new(raw: u32) -> OverlayHeapFlags {
        OverlayHeapFlags(raw)
    }

    /// Sets the uncached flag's presence.
    #[inline(always)]
    pub fn use_uncached(self, e: bool) -> OverlayHeapFlags {
        if e {
            OverlayHeapFlags(self.0 | OVERLAY_HEAP_USE_UNCACHED)
        } else {
            OverlayHeapFlags(self.0 & !OVERLAY_HEAP_USE_UNCACHED)
        }
    }

    /// Sets the hardware-protected flag's presence.
    #[inline(always)]
    pub fn use_protected(self, e: bool) -> OverlayHeapFlags {
        if e {
            OverlayHeapFlags(self.0 | OVERLAY_HEAP_USE_PROTECTED)
        } else {
            OverlayHeapFlags(self.0 & !OVERLAY_HEAP_USE_PROTECTED)
        }
    }

    /// Sets the general iommu heap flag's presence.
    #[inline(always)]
    pub fn use_iommu_heap(self, e: bool) -> OverlayHeapFlags {
        if e {
            OverlayHeapFlags(self.0 | OVERLAY_HEAP_USE_IOMMU)
        } else {
            OverlayHeapFlags(self.0 & !OVERLAY_HEAP_USE_IOMMU)
        }
    }

    /// Sets the multimedia heap flag's presence.
    #[inline(always)]
    pub fn use_mm_heap(self, e: bool) -> OverlayHeapFlags {
        if e {
            OverlayHeapFlags(self.0 | OVERLAY_HEAP_USE_MM)
        } else {
            OverlayHeapFlags(self.0 & !OVERLAY_HEAP_USE_MM)
        }
    }

    /// Returns true if the allocation must be hardware protected.
    #[inline(always)]
    pub fn protected(self) -> bool {
        self.0 & OVERLAY_HEAP_USE_PROTECTED != 0
    }

    /// Returns true if the allocation will be accessed through the CPU cache.
    #[inline(always)]
    pub fn cached(self) -> bool {
        self.0 & OVERLAY_HEAP_USE_UNCACHED == 0
    }

    /// Returns true if the allocation comes from the multimedia heap.
    #[inline(always)]
    pub fn uses_mm_heap(self) -> bool {
        self.0 & OVERLAY_HEAP_USE_MM != 0
    }
}

/// Information required to allocate a run of overlay buffers.
#[derive(Copy, Clone, Default)]
pub struct AllocationInfo {
    pub num_bufs: u32,
    pub buf_size: u64,
    pub flags: OverlayHeapFlags,
}

/// The alignment, total size and mapping properties of an overlay allocation.
#[derive(Copy, Clone, Default)]
pub struct AllocationRequirements {
    pub info: AllocationInfo,
    pub aligned_size: u64,
    pub total_size: u64,
    pub map_info: u32,
}

/// Computes the requirements every heap backend must honor: secure buffers are 1 MiB
/// aligned, general heap buffers are page aligned, and the total covers all buffers.
pub fn canonical_allocation_requirements(
    info: AllocationInfo,
) -> HwcResult<AllocationRequirements> {
    if info.num_bufs == 0 || info.buf_size == 0 {
        return Err(HwcError::InvalidAllocationRequest);
    }

    let aligned_size = if info.flags.protected() {
        let buf_size = info.buf_size;
        align_upwards!(buf_size, SIZE_1M)
    } else {
        round_up_to_page_size(info.buf_size)?
    };

    let num_bufs = info.num_bufs as u64;
    let total_size = checked_arithmetic!(aligned_size * num_bufs)?;

    let mut map_info = HWC_MAP_ACCESS_RW;
    map_info |= if info.flags.cached() {
        HWC_MAP_CACHE_CACHED
    } else {
        HWC_MAP_CACHE_UNCACHED
    };

    Ok(AllocationRequirements {
        info,
        aligned_size,
        total_size,
        map_info,
    })
}

/// Trait that needs to be implemented to service overlay memory requests.  Two step
/// allocation process:
///
///   (1) Get allocation requirements for a given request.
///   (2) Allocate using those requirements.
///
/// Freeing goes through the returned handle: dropping the handle (and any mapping made
/// from it) is the backend's free path.
pub trait Allocator: Send {
    /// This function must return true if the backend can allocate buffers that the display
    /// controller may place under hardware protection.
    fn supports_secure(&self) -> bool;

    /// Implementations must return the alignment and sizing of an allocation request.
    fn get_allocation_requirements(
        &mut self,
        info: AllocationInfo,
    ) -> HwcResult<AllocationRequirements>;

    /// Implementations must allocate memory given the requirements and return an HwcHandle
    /// upon success.
    fn allocate(&mut self, reqs: AllocationRequirements) -> HwcResult<HwcHandle>;
}

/// Enumeration of possible heap backends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum HeapBackend {
    #[allow(dead_code)]
    Ion,
    System,
}

/// A container for the available heap backends, plus the display-controller seam used to
/// toggle hardware protection on allocated buffers.
pub struct OverlayAllocator {
    heaps: Map<HeapBackend, Box<dyn Allocator>>,
    secure_control: Option<Box<dyn SecureBufferControl>>,
}

impl OverlayAllocator {
    /// Returns a new OverlayAllocator instance upon success.  All heap backends that have
    /// been built are initialized.  The default system heap is always initialized.
    pub fn new() -> HwcResult<OverlayAllocator> {
        let mut heaps: Map<HeapBackend, Box<dyn Allocator>> = Default::default();

        let system = SystemHeap::init()?;
        heaps.insert(HeapBackend::System, system);

        #[cfg(feature = "ion")]
        {
            // The ion device is only present on the target.  Development hosts run with the
            // system heap alone, so let ion initialization fail silently.
            if let Ok(ion) = IonHeap::init() {
                heaps.insert(HeapBackend::Ion, ion);
            }
        }

        let secure_control = MdpControl::open()
            .ok()
            .map(|c| Box::new(c) as Box<dyn SecureBufferControl>);

        Ok(OverlayAllocator {
            heaps,
            secure_control,
        })
    }

    /// Replaces the display-controller seam, for hosts that route secure-buffer
    /// configuration through something other than the default control node.
    pub fn with_secure_control(mut self, control: Box<dyn SecureBufferControl>) -> Self {
        self.secure_control = Some(control);
        self
    }

    /// Registers `heap` as the backend of the given kind, replacing any existing one.
    /// Targets with a vendor allocation path register it here.
    pub fn register_heap(&mut self, backend: HeapBackend, heap: Box<dyn Allocator>) {
        self.heaps.insert(backend, heap);
    }

    /// Returns true if one of the heap backends supports hardware-protected buffers.
    pub fn supports_secure(&self) -> bool {
        for heap in self.heaps.values() {
            if heap.supports_secure() {
                return true;
            }
        }

        false
    }

    /// Returns the heap backend to service a particular request.  Protected requests
    /// require a backend with secure support.
    pub fn determine_backend(&self, info: AllocationInfo) -> HwcResult<HeapBackend> {
        if info.flags.protected() {
            return self
                .heaps
                .iter()
                .find(|(_, heap)| heap.supports_secure())
                .map(|(backend, _)| *backend)
                .ok_or(HwcError::InvalidHeapBackend);
        }

        let mut backend = HeapBackend::System;

        #[cfg(feature = "ion")]
        {
            // Display hardware scans out of ion memory when it is available.
            if self.heaps.contains_key(&HeapBackend::Ion) {
                backend = HeapBackend::Ion;
            }
        }

        Ok(backend)
    }

    /// Returns allocation requirements for the given `info` upon success.
    pub fn get_allocation_requirements(
        &mut self,
        info: AllocationInfo,
    ) -> HwcResult<AllocationRequirements> {
        let backend = self.determine_backend(info)?;

        let heap = self
            .heaps
            .get_mut(&backend)
            .ok_or(HwcError::InvalidHeapBackend)?;

        heap.get_allocation_requirements(info)
    }

    /// Allocates memory given the particular `reqs` upon success.
    pub fn allocate(&mut self, reqs: AllocationRequirements) -> HwcResult<HwcHandle> {
        let backend = self.determine_backend(reqs.info)?;

        let heap = self
            .heaps
            .get_mut(&backend)
            .ok_or(HwcError::InvalidHeapBackend)?;

        heap.allocate(reqs)
    }

    /// Toggles hardware protection on the buffer behind `descriptor` through the display
    /// controller.
    pub fn set_secure(
        &mut self,
        descriptor: &dyn AsRawDescriptor,
        enable: bool,
    ) -> HwcResult<()> {
        let control = self
            .secure_control
            .as_mut()
            .ok_or(HwcError::Unsupported)?;
        control.set_secure(descriptor, enable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_requirements_are_page_aligned() {
        let info = AllocationInfo {
            num_bufs: 2,
            buf_size: 100,
            flags: OverlayHeapFlags::empty().use_uncached(true).use_iommu_heap(true),
        };

        let reqs = canonical_allocation_requirements(info).unwrap();
        let page_size = round_up_to_page_size(1).unwrap();

        assert_eq!(reqs.aligned_size, page_size);
        assert_eq!(reqs.total_size, 2 * page_size);
        assert_eq!(reqs.map_info & HWC_MAP_CACHE_MASK, HWC_MAP_CACHE_UNCACHED);
        assert_eq!(reqs.map_info & HWC_MAP_ACCESS_MASK, HWC_MAP_ACCESS_RW);
    }

    #[test]
    fn secure_requirements_are_1m_aligned() {
        let info = AllocationInfo {
            num_bufs: 3,
            buf_size: SIZE_1M + 1,
            flags: OverlayHeapFlags::empty()
                .use_uncached(true)
                .use_protected(true)
                .use_mm_heap(true),
        };

        let reqs = canonical_allocation_requirements(info).unwrap();

        assert_eq!(reqs.aligned_size, 2 * SIZE_1M);
        assert_eq!(reqs.total_size, 6 * SIZE_1M);
    }

    #[test]
    fn zero_sized_requests_are_rejected() {
        let info = AllocationInfo {
            num_bufs: 0,
            buf_size: 4096,
            flags: OverlayHeapFlags::empty(),
        };
        assert!(canonical_allocation_requirements(info).is_err());

        let info = AllocationInfo {
            num_bufs: 1,
            buf_size: 0,
            flags: OverlayHeapFlags::empty(),
        };
        assert!(canonical_allocation_requirements(info).is_err());
    }

    #[test]
    fn oversized_requests_fail_checked_arithmetic() {
        let info = AllocationInfo {
            num_bufs: 4,
            buf_size: u64::MAX / 2,
            flags: OverlayHeapFlags::empty(),
        };
        assert!(canonical_allocation_requirements(info).is_err());
    }
}
