// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::hwc_os::sys::platform::MemoryMapping as PlatformMapping;
use crate::hwc_os::AsRawDescriptor;
use crate::hwc_utils::HwcResult;

/// A mapping of an overlay buffer allocation into the current process.
///
/// The descriptor is only borrowed for the duration of the map call; the mapping stays valid
/// after the descriptor is closed.
pub struct MemoryMapping {
    mapping: PlatformMapping,
}

impl MemoryMapping {
    pub fn from_descriptor(
        descriptor: &dyn AsRawDescriptor,
        size: usize,
        map_info: u32,
    ) -> HwcResult<MemoryMapping> {
        let mapping = PlatformMapping::from_descriptor(descriptor, size, map_info)?;
        Ok(MemoryMapping { mapping })
    }

    /// Returns a pointer to the base of the mapping.
    pub fn as_ptr(&self) -> *mut u8 {
        self.mapping.addr as *mut u8
    }

    /// Returns the size of the mapping in bytes.
    pub fn size(&self) -> usize {
        self.mapping.size
    }
}
