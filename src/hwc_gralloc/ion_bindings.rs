// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#![cfg(feature = "ion")]
#![allow(non_camel_case_types)]

//! Hand-written bindings for the ion allocator uapi.  Kept consistent with
//! include/uapi/linux/ion.h and the vendor heap layout.

use std::os::raw::c_uint;

use nix::ioctl_readwrite;

pub const ION_DEVICE_PATH: &str = "/dev/ion";

/// Vendor heap ids.  The multimedia heap backs content-protected scanout; the system
/// heap backs everything else.
pub const ION_CP_MM_HEAP_ID: c_uint = 8;
pub const ION_SYSTEM_HEAP_ID: c_uint = 25;

/// Mappings of this allocation are CPU cached.
pub const ION_FLAG_CACHED: c_uint = 1;
/// The allocation is locked down by the content-protection unit.
pub const ION_FLAG_SECURE: c_uint = 1 << 31;

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct ion_allocation_data {
    pub len: u64,
    pub heap_id_mask: u32,
    pub flags: u32,
    pub fd: u32,
    pub unused: u32,
}

const ION_IOC_MAGIC: u8 = b'I';
const ION_IOC_ALLOC: u8 = 0;

ioctl_readwrite!(ion_alloc, ION_IOC_MAGIC, ION_IOC_ALLOC, ion_allocation_data);
