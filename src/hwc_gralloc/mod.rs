// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This module implements allocation of overlay memory for the display pipeline,
//! and the lifecycle of secure, hardware-protected buffers.  This is based on
//! "gralloc", a well-known Android hardware abstraction layer (HAL).
//!
//! <https://source.android.com/devices/graphics/arch-bq-gralloc>

mod alloc;
mod ion;
mod ion_bindings;
mod mdp;
mod overlay_mem;
mod system_heap;

pub use alloc::AllocationInfo;
pub use alloc::AllocationRequirements;
pub use alloc::Allocator;
pub use alloc::HeapBackend;
pub use alloc::OverlayAllocator;
pub use alloc::OverlayHeapFlags;
pub use alloc::SIZE_1M;
pub use mdp::MdpControl;
pub use mdp::SecureBufferControl;
pub use overlay_mem::OverlayMem;
