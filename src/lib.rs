// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! A crate for adapting host display-API layer state onto a mobile display-manager
//! pipeline, along with overlay memory allocation and secure-buffer lifecycle.

#[macro_use]
mod macros;
mod hwc_gralloc;
mod hwc_layer;
mod hwc_os;
mod hwc_utils;

pub use crate::hwc_gralloc::AllocationInfo;
pub use crate::hwc_gralloc::AllocationRequirements;
pub use crate::hwc_gralloc::Allocator;
pub use crate::hwc_gralloc::HeapBackend;
pub use crate::hwc_gralloc::MdpControl;
pub use crate::hwc_gralloc::OverlayAllocator;
pub use crate::hwc_gralloc::OverlayHeapFlags;
pub use crate::hwc_gralloc::OverlayMem;
pub use crate::hwc_gralloc::SecureBufferControl;
pub use crate::hwc_gralloc::SIZE_1M;
pub use crate::hwc_layer::*;
pub use crate::hwc_os::AsRawDescriptor;
pub use crate::hwc_os::Descriptor;
pub use crate::hwc_os::FromRawDescriptor as HwcFromRawDescriptor;
pub use crate::hwc_os::IntoRawDescriptor as HwcIntoRawDescriptor;
pub use crate::hwc_os::MemoryMapping as HwcMemoryMapping;
pub use crate::hwc_os::RawDescriptor;
pub use crate::hwc_os::SafeDescriptor as HwcDescriptor;
pub use crate::hwc_utils::*;
