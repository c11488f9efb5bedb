// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! buffer: The host gralloc handle as the adapter sees it, and the display manager's
//! input-buffer record built from it.

use crate::hwc_layer::fence::SyncFence;
use crate::hwc_layer::formats::BufferFormat;
use crate::hwc_layer::formats::HalPixelFormat;
use crate::hwc_layer::layer::LayerCsc;
use crate::hwc_layer::layer::LayerIgc;
use crate::hwc_layer::layer::S3dFormat;
use crate::hwc_layer::metadata::BufferMetadata;
use crate::hwc_os::AsRawDescriptor;
use crate::hwc_os::RawDescriptor;

/*
 * Private handle flags, fixed by the host gralloc.
 */
pub const PRIV_FLAGS_SECURE_BUFFER: u32 = 0x00000400;
pub const PRIV_FLAGS_SECURE_DISPLAY: u32 = 0x00800000;
pub const PRIV_FLAGS_UBWC_ALIGNED: u32 = 0x02000000;

pub const BUFFER_TYPE_UI: u32 = 0;
pub const BUFFER_TYPE_VIDEO: u32 = 1;

/// The host gralloc's private buffer handle.  The host owns the descriptor; the adapter
/// dups what it needs to outlive the call.
#[repr(C)]
#[derive(Debug)]
pub struct BufferHandle {
    pub fd: RawDescriptor,
    pub size: u32,
    pub offset: u32,
    pub buffer_type: u32,
    pub width: i32,
    pub height: i32,
    pub format: HalPixelFormat,
    pub flags: u32,
    pub id: u64,
    pub metadata: BufferMetadata,
}

impl BufferHandle {
    pub fn is_ubwc_aligned(&self) -> bool {
        self.flags & PRIV_FLAGS_UBWC_ALIGNED != 0
    }

    /// TZ protected buffer.
    pub fn is_secure(&self) -> bool {
        self.flags & PRIV_FLAGS_SECURE_BUFFER != 0
    }

    pub fn is_secure_display(&self) -> bool {
        self.flags & PRIV_FLAGS_SECURE_DISPLAY != 0
    }

    pub fn is_video(&self) -> bool {
        self.buffer_type == BUFFER_TYPE_VIDEO
    }
}

impl AsRawDescriptor for BufferHandle {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.fd
    }
}

/// Per-plane addressing of the input buffer.
#[derive(Copy, Clone, Debug)]
pub struct BufferPlane {
    pub fd: RawDescriptor,
    pub offset: u32,
    pub stride: u32,
}

impl Default for BufferPlane {
    fn default() -> BufferPlane {
        BufferPlane {
            fd: -1,
            offset: 0,
            stride: 0,
        }
    }
}

/// Content flags of the input buffer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BufferFlags {
    pub video: bool,
    pub secure: bool,
    pub secure_display: bool,
    pub interlace: bool,
}

/// The display manager's view of a layer's input buffer.
#[derive(Default)]
pub struct LayerBuffer {
    pub width: u32,
    pub height: u32,
    pub format: BufferFormat,
    pub plane: BufferPlane,
    pub acquire_fence: Option<SyncFence>,
    pub id: u64,
    pub flags: BufferFlags,
    pub csc: LayerCsc,
    pub igc: LayerIgc,
    pub s3d_format: S3dFormat,
}
