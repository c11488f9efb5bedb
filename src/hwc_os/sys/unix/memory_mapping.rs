// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::num::NonZeroUsize;

use libc::c_void;
use nix::sys::mman::mmap;
use nix::sys::mman::munmap;
use nix::sys::mman::MapFlags;
use nix::sys::mman::ProtFlags;

use crate::hwc_os::descriptor::AsRawDescriptor;
use crate::hwc_utils::HwcError;
use crate::hwc_utils::HwcResult;

use crate::hwc_utils::HWC_MAP_ACCESS_MASK;
use crate::hwc_utils::HWC_MAP_ACCESS_READ;
use crate::hwc_utils::HWC_MAP_ACCESS_RW;
use crate::hwc_utils::HWC_MAP_ACCESS_WRITE;

/// Wraps a shared memory mapping in the current process. Provides RAII semantics including
/// munmap when no longer needed.
#[derive(Debug)]
pub struct MemoryMapping {
    pub addr: *mut c_void,
    pub size: usize,
}

impl Drop for MemoryMapping {
    fn drop(&mut self) {
        // This is safe because we mmap the area at addr ourselves, and nobody
        // else is holding a reference to it.
        unsafe {
            munmap(self.addr as *mut libc::c_void, self.size).unwrap();
        }
    }
}

impl MemoryMapping {
    pub fn from_descriptor(
        descriptor: &dyn AsRawDescriptor,
        size: usize,
        map_info: u32,
    ) -> HwcResult<MemoryMapping> {
        let non_zero_opt = NonZeroUsize::new(size);
        let prot = match map_info & HWC_MAP_ACCESS_MASK {
            HWC_MAP_ACCESS_READ => ProtFlags::PROT_READ,
            HWC_MAP_ACCESS_WRITE => ProtFlags::PROT_READ,
            HWC_MAP_ACCESS_RW => ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
            _ => return Err(HwcError::SpecViolation("incorrect access flags")),
        };

        if let Some(non_zero_size) = non_zero_opt {
            let addr = unsafe {
                mmap(
                    None,
                    non_zero_size,
                    prot,
                    MapFlags::MAP_SHARED,
                    descriptor.as_raw_descriptor(),
                    0,
                )?
            };
            Ok(MemoryMapping { addr, size })
        } else {
            Err(HwcError::SpecViolation("zero size mapping"))
        }
    }
}
