// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! hwc_utils: Utility enums, structs, and implementations needed by the rest of the crate.

use std::io::Error as IoError;
use std::num::TryFromIntError;

#[cfg(unix)]
use nix::Error as NixError;
use remain::sorted;
use thiserror::Error;

use crate::hwc_os::SafeDescriptor;

/// Mapped memory caching flags, recorded per allocation and consulted both by the
/// mapping path and by heap backends that support cache control.
pub const HWC_MAP_CACHE_MASK: u32 = 0x0f;
pub const HWC_MAP_CACHE_CACHED: u32 = 0x01;
pub const HWC_MAP_CACHE_UNCACHED: u32 = 0x02;
/// Access flags for mapped memory.
pub const HWC_MAP_ACCESS_MASK: u32 = 0xf0;
pub const HWC_MAP_ACCESS_READ: u32 = 0x10;
pub const HWC_MAP_ACCESS_WRITE: u32 = 0x20;
pub const HWC_MAP_ACCESS_RW: u32 = 0x30;

/// Handle types (memory and sync in same namespace)
pub const HWC_MEM_HANDLE_TYPE_ION: u32 = 0x0001;
pub const HWC_MEM_HANDLE_TYPE_DMABUF: u32 = 0x0002;
pub const HWC_MEM_HANDLE_TYPE_SHM: u32 = 0x0003;

pub const HWC_FENCE_HANDLE_TYPE_SYNC_FD: u32 = 0x0004;

/// An error generated while using this crate.
#[sorted]
#[derive(Error, Debug)]
pub enum HwcError {
    /// The overlay memory handle is already open.
    #[error("attempted to open an overlay memory handle already in use")]
    AlreadyInUse,
    /// Checked Arithmetic error
    #[error("arithmetic failed: {}({}) {op} {}({})", .field1.0, .field1.1, .field2.0, .field2.1)]
    CheckedArithmetic {
        field1: (&'static str, usize),
        field2: (&'static str, usize),
        op: &'static str,
    },
    /// Checked Range error
    #[error("range check failed: {}({}) vs {}({})", .field1.0, .field1.1, .field2.0, .field2.1)]
    CheckedRange {
        field1: (&'static str, usize),
        field2: (&'static str, usize),
    },
    /// Invalid overlay allocation request.
    #[error("invalid overlay allocation request")]
    InvalidAllocationRequest,
    /// A null or descriptor-less buffer handle was given to the layer adapter.
    #[error("invalid buffer handle")]
    InvalidBufferHandle,
    /// A zero-valued fence descriptor was given to the layer adapter.
    #[error("invalid fence descriptor")]
    InvalidFence,
    /// An error with the HwcHandle.
    #[error("invalid hwc handle")]
    InvalidHandle,
    /// Invalid heap backend.
    #[error("invalid heap backend")]
    InvalidHeapBackend,
    /// A host display-API call carried a bad parameter.
    #[error("invalid layer parameter: {0}")]
    InvalidLayerParameter(&'static str),
    /// An input/output error occured.
    #[error("an input/output error occured: {0}")]
    IoError(IoError),
    /// Nix crate error.
    #[cfg(unix)]
    #[error("the errno is {0}")]
    NixError(NixError),
    /// The display controller refused to toggle buffer protection.
    #[error("secure buffer toggle failed with error {0}")]
    SecureToggleFailed(i32),
    /// Violation of an internal invariant occured.
    #[error("invariant violation: {0}")]
    SpecViolation(&'static str),
    /// An attempted integer conversion failed.
    #[error("int conversion failed: {0}")]
    TryFromIntError(TryFromIntError),
    /// The operation is unsupported.
    #[error("the requested function is not implemented")]
    Unsupported,
}

#[cfg(unix)]
impl From<NixError> for HwcError {
    fn from(e: NixError) -> HwcError {
        HwcError::NixError(e)
    }
}

impl From<IoError> for HwcError {
    fn from(e: IoError) -> HwcError {
        HwcError::IoError(e)
    }
}

impl From<TryFromIntError> for HwcError {
    fn from(e: TryFromIntError) -> HwcError {
        HwcError::TryFromIntError(e)
    }
}

/// The result of an operation in this crate.
pub type HwcResult<T> = std::result::Result<T, HwcError>;

/// Handle to an OS-specific memory or synchronization object.
pub struct HwcHandle {
    pub os_handle: SafeDescriptor,
    pub handle_type: u32,
}

impl HwcHandle {
    /// Clones an existing handle, by using OS specific mechanisms.
    pub fn try_clone(&self) -> HwcResult<HwcHandle> {
        let clone = self
            .os_handle
            .try_clone()
            .map_err(|_| HwcError::InvalidHandle)?;
        Ok(HwcHandle {
            os_handle: clone,
            handle_type: self.handle_type,
        })
    }
}

/// An integer rectangle as passed by the host display API for display frames,
/// visible regions and surface damage.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A fractional rectangle as passed by the host display API for source crops.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// The display manager's rectangle representation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct LayerRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl From<Rect> for LayerRect {
    fn from(source: Rect) -> LayerRect {
        LayerRect {
            left: source.left as f32,
            top: source.top as f32,
            right: source.right as f32,
            bottom: source.bottom as f32,
        }
    }
}

impl From<FRect> for LayerRect {
    /// Fractional crops shrink to the enclosed pixel grid, per the host
    /// display API's source crop rounding rules.
    fn from(source: FRect) -> LayerRect {
        LayerRect {
            left: source.left.ceil(),
            top: source.top.ceil(),
            right: source.right.floor(),
            bottom: source.bottom.floor(),
        }
    }
}

/// A solid fill color as passed by the host display API.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Returns the color packed as 32-bit ARGB.
    pub fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | (self.b as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_conversion_is_exact() {
        let rect = Rect {
            left: 10,
            top: 20,
            right: 1920,
            bottom: 1080,
        };
        let layer_rect = LayerRect::from(rect);
        assert_eq!(layer_rect.left, 10.0);
        assert_eq!(layer_rect.top, 20.0);
        assert_eq!(layer_rect.right, 1920.0);
        assert_eq!(layer_rect.bottom, 1080.0);
    }

    #[test]
    fn frect_conversion_shrinks_to_pixel_grid() {
        let crop = FRect {
            left: 0.25,
            top: 1.75,
            right: 100.5,
            bottom: 50.25,
        };
        let layer_rect = LayerRect::from(crop);
        assert_eq!(layer_rect.left, 1.0);
        assert_eq!(layer_rect.top, 2.0);
        assert_eq!(layer_rect.right, 100.0);
        assert_eq!(layer_rect.bottom, 50.0);
    }

    #[test]
    fn color_packs_argb() {
        let color = Color {
            r: 0x11,
            g: 0x22,
            b: 0x33,
            a: 0xff,
        };
        assert_eq!(color.to_argb(), 0xff112233);
    }
}
