// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! overlay_mem: One handle binding an overlay allocation, its mapping and its
//! hardware-protection state together.

use log::debug;
use log::warn;

use crate::hwc_gralloc::alloc::AllocationInfo;
use crate::hwc_gralloc::alloc::HeapBackend;
use crate::hwc_gralloc::alloc::OverlayAllocator;
use crate::hwc_gralloc::alloc::OverlayHeapFlags;
use crate::hwc_os::AsRawDescriptor;
use crate::hwc_os::MemoryMapping;
use crate::hwc_os::RawDescriptor;
use crate::hwc_utils::*;

/// Holds the descriptor, base mapping and protection state of a run of overlay buffers.
///
/// A handle starts out invalid.  `open` makes it valid; `close` returns it to the invalid
/// state.  Dropping a still-open handle releases the memory through the owned descriptor
/// and mapping, but cannot lift hardware protection; secure handles must be closed
/// explicitly.
pub struct OverlayMem {
    handle: Option<HwcHandle>,
    mapping: Option<MemoryMapping>,
    backend: Option<HeapBackend>,
    buf_size: u64,
    buf_size_aligned: u64,
    num_bufs: u32,
    secured: bool,
}

impl Default for OverlayMem {
    fn default() -> OverlayMem {
        OverlayMem::new()
    }
}

impl OverlayMem {
    /// Returns a handle in the invalid state.
    pub fn new() -> OverlayMem {
        OverlayMem {
            handle: None,
            mapping: None,
            backend: None,
            buf_size: 0,
            buf_size_aligned: 0,
            num_bufs: 0,
            secured: false,
        }
    }

    /// Opens `num_bufs` buffers of `buf_size` bytes each.  Secure buffers come from the
    /// protected multimedia heap at 1 MiB alignment and are locked down through the
    /// display controller; general buffers come from the iommu heap at page alignment.
    /// Overlay buffers are never CPU cached.
    ///
    /// On failure the handle is left invalid and nothing is partially applied.
    pub fn open(
        &mut self,
        allocator: &mut OverlayAllocator,
        num_bufs: u32,
        buf_size: u64,
        secure: bool,
    ) -> HwcResult<()> {
        if self.valid() {
            return Err(HwcError::AlreadyInUse);
        }

        let flags = OverlayHeapFlags::empty()
            .use_uncached(true)
            .use_protected(secure)
            .use_mm_heap(secure)
            .use_iommu_heap(!secure);

        let info = AllocationInfo {
            num_bufs,
            buf_size,
            flags,
        };

        let backend = allocator.determine_backend(info)?;
        let reqs = allocator.get_allocation_requirements(info)?;
        let handle = allocator.allocate(reqs)?;

        let total_size = usize::try_from(reqs.total_size)?;
        let mapping = MemoryMapping::from_descriptor(&handle.os_handle, total_size, reqs.map_info)?;

        if secure {
            // Dropping handle and mapping frees the allocation if the controller refuses.
            allocator.set_secure(&handle.os_handle, true)?;
        }

        self.handle = Some(handle);
        self.mapping = Some(mapping);
        self.backend = Some(backend);
        self.buf_size = buf_size;
        self.buf_size_aligned = reqs.aligned_size;
        self.num_bufs = num_bufs;
        self.secured = secure;

        Ok(())
    }

    /// Lifts hardware protection if needed, frees the allocation through the owned
    /// descriptor and mapping, and resets the handle to the invalid state.  Closing an
    /// invalid handle succeeds.
    pub fn close(&mut self, allocator: &mut OverlayAllocator) -> HwcResult<()> {
        if !self.valid() {
            return Ok(());
        }

        if self.secured {
            if let Err(e) = self.set_secure(allocator, false) {
                warn!("failed to unsecure overlay memory on close: {}", e);
            }
        }

        // Unmap before releasing the descriptor; this is the allocator's free path.
        self.mapping = None;
        self.handle = None;
        self.backend = None;
        self.buf_size = 0;
        self.buf_size_aligned = 0;
        self.num_bufs = 0;
        self.secured = false;
        Ok(())
    }

    /// Re-toggles hardware protection through the display controller.  On failure the
    /// secured flag is cleared, matching the controller's view of the buffer.
    pub fn set_secure(
        &mut self,
        allocator: &mut OverlayAllocator,
        enable: bool,
    ) -> HwcResult<()> {
        let handle = self.handle.as_ref().ok_or(HwcError::InvalidHandle)?;

        match allocator.set_secure(&handle.os_handle, enable) {
            Ok(()) => {
                self.secured = enable;
                Ok(())
            }
            Err(e) => {
                self.secured = false;
                Err(e)
            }
        }
    }

    /// Returns true if the descriptor and the base mapping are both present.
    pub fn valid(&self) -> bool {
        self.handle.is_some() && self.mapping.is_some()
    }

    /// Returns the underlying raw descriptor while the handle is open.
    pub fn descriptor(&self) -> Option<RawDescriptor> {
        self.handle.as_ref().map(|h| h.os_handle.as_raw_descriptor())
    }

    /// Returns the base address of the mapping while the handle is open.
    pub fn base_addr(&self) -> Option<*mut u8> {
        self.mapping.as_ref().map(|m| m.as_ptr())
    }

    /// Returns the buffer size requested by the client.
    pub fn buf_size(&self) -> u64 {
        self.buf_size
    }

    /// Returns the aligned buffer size used for the actual allocation.
    pub fn buf_size_aligned(&self) -> u64 {
        self.buf_size_aligned
    }

    /// Returns the number of buffers.
    pub fn num_bufs(&self) -> u32 {
        self.num_bufs
    }

    /// Returns true while the buffers are hardware protected.
    pub fn secured(&self) -> bool {
        self.secured
    }

    /// Returns the heap backend that served the allocation while the handle is open.
    pub fn backend(&self) -> Option<HeapBackend> {
        self.backend
    }

    /// Logs the state of the handle.
    pub fn dump(&self) {
        debug!(
            "OverlayMem fd={:?} addr={:?} bufsz={} aligned_bufsz={} numbufs={} secured={}",
            self.descriptor(),
            self.base_addr(),
            self.buf_size,
            self.buf_size_aligned,
            self.num_bufs,
            self.secured
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::hwc_gralloc::alloc::canonical_allocation_requirements;
    use crate::hwc_gralloc::alloc::AllocationRequirements;
    use crate::hwc_gralloc::alloc::Allocator;
    use crate::hwc_gralloc::alloc::SIZE_1M;
    use crate::hwc_gralloc::mdp::SecureBufferControl;
    use crate::hwc_os::round_up_to_page_size;
    use crate::hwc_os::SharedMemory;

    /// A memfd-backed stand-in for the protected multimedia heap.
    struct FakeSecureHeap;

    impl Allocator for FakeSecureHeap {
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
            let shm = SharedMemory::new("fake_secure_heap", reqs.total_size)?;
            Ok(HwcHandle {
                os_handle: shm.into(),
                handle_type: HWC_MEM_HANDLE_TYPE_DMABUF,
            })
        }
    }

    /// Records every toggle it is asked to perform, failing once `fail_after` calls have
    /// been made.
    struct RecordingControl {
        log: Arc<Mutex<Vec<bool>>>,
        fail_after: usize,
    }

    impl SecureBufferControl for RecordingControl {
        fn set_secure(
            &mut self,
            _descriptor: &dyn AsRawDescriptor,
            enable: bool,
        ) -> HwcResult<()> {
            let mut log = self.log.lock().unwrap();
            if log.len() >= self.fail_after {
                return Err(HwcError::SecureToggleFailed(libc::EACCES));
            }
            log.push(enable);
            Ok(())
        }
    }

    fn secure_allocator(log: Arc<Mutex<Vec<bool>>>, fail_after: usize) -> OverlayAllocator {
        let mut allocator = OverlayAllocator::new().unwrap();
        allocator.register_heap(HeapBackend::Ion, Box::new(FakeSecureHeap));
        allocator.with_secure_control(Box::new(RecordingControl { log, fail_after }))
    }

    #[test]
    fn open_and_close_general_heap() {
        let mut allocator = OverlayAllocator::new().unwrap();
        let mut mem = OverlayMem::new();
        assert!(!mem.valid());

        mem.open(&mut allocator, 2, 100, false).unwrap();
        assert!(mem.valid());
        assert!(mem.descriptor().is_some());
        assert!(mem.base_addr().is_some());
        assert_eq!(mem.buf_size(), 100);
        assert_eq!(mem.buf_size_aligned(), round_up_to_page_size(100).unwrap());
        assert_eq!(mem.num_bufs(), 2);
        assert!(!mem.secured());

        mem.close(&mut allocator).unwrap();
        assert!(!mem.valid());
        assert_eq!(mem.num_bufs(), 0);

        // Closing an invalid handle succeeds.
        mem.close(&mut allocator).unwrap();
    }

    #[test]
    fn open_rejects_zero_sizes() {
        let mut allocator = OverlayAllocator::new().unwrap();
        let mut mem = OverlayMem::new();

        assert!(mem.open(&mut allocator, 0, 4096, false).is_err());
        assert!(mem.open(&mut allocator, 1, 0, false).is_err());
        assert!(!mem.valid());
    }

    #[test]
    fn reopen_requires_close() {
        let mut allocator = OverlayAllocator::new().unwrap();
        let mut mem = OverlayMem::new();

        mem.open(&mut allocator, 1, 4096, false).unwrap();
        assert!(matches!(
            mem.open(&mut allocator, 1, 4096, false),
            Err(HwcError::AlreadyInUse)
        ));

        mem.close(&mut allocator).unwrap();
        mem.open(&mut allocator, 1, 4096, false).unwrap();
        mem.close(&mut allocator).unwrap();
    }

    #[test]
    fn secure_open_aligns_to_1m_and_toggles_protection() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut allocator = secure_allocator(log.clone(), usize::MAX);
        let mut mem = OverlayMem::new();

        mem.open(&mut allocator, 2, SIZE_1M / 2, true).unwrap();
        assert!(mem.valid());
        assert!(mem.secured());
        assert_eq!(mem.buf_size_aligned(), SIZE_1M);
        assert_eq!(mem.backend(), Some(HeapBackend::Ion));
        assert_eq!(*log.lock().unwrap(), vec![true]);

        mem.close(&mut allocator).unwrap();
        assert!(!mem.valid());
        assert!(!mem.secured());
        assert_eq!(*log.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn secure_toggle_failure_leaves_handle_invalid() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut allocator = secure_allocator(log, 0);
        let mut mem = OverlayMem::new();

        assert!(mem.open(&mut allocator, 1, SIZE_1M, true).is_err());
        assert!(!mem.valid());
        assert!(!mem.secured());
    }

    #[test]
    fn set_secure_requires_open_handle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut allocator = secure_allocator(log, usize::MAX);
        let mut mem = OverlayMem::new();

        assert!(matches!(
            mem.set_secure(&mut allocator, true),
            Err(HwcError::InvalidHandle)
        ));
    }

    #[test]
    fn set_secure_failure_clears_secured_flag() {
        let log = Arc::new(Mutex::new(Vec::new()));
        // One successful toggle (the open), then failures.
        let mut allocator = secure_allocator(log, 1);
        let mut mem = OverlayMem::new();

        mem.open(&mut allocator, 1, SIZE_1M, true).unwrap();
        assert!(mem.secured());

        assert!(mem.set_secure(&mut allocator, true).is_err());
        assert!(!mem.secured());
        assert!(mem.valid());

        mem.close(&mut allocator).unwrap();
        assert!(!mem.valid());
    }
}

