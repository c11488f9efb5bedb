// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! formats: Translation of host pixel-format codes into the display manager's format
//! enumeration, including the hardware-compressed (UBWC) variants.

use std::fmt;

use log::warn;

/*
 * Host pixel-format codes, fixed by the display API.  The 0x100+ range carries the
 * vendor codecs (Venus) and compressed layouts.
 */
pub const HAL_PIXEL_FORMAT_RGBA_8888: HalPixelFormat = HalPixelFormat(0x1);
pub const HAL_PIXEL_FORMAT_RGBX_8888: HalPixelFormat = HalPixelFormat(0x2);
pub const HAL_PIXEL_FORMAT_RGB_888: HalPixelFormat = HalPixelFormat(0x3);
pub const HAL_PIXEL_FORMAT_RGB_565: HalPixelFormat = HalPixelFormat(0x4);
pub const HAL_PIXEL_FORMAT_BGRA_8888: HalPixelFormat = HalPixelFormat(0x5);
pub const HAL_PIXEL_FORMAT_RGBA_5551: HalPixelFormat = HalPixelFormat(0x6);
pub const HAL_PIXEL_FORMAT_RGBA_4444: HalPixelFormat = HalPixelFormat(0x7);
pub const HAL_PIXEL_FORMAT_YCBCR_422_SP: HalPixelFormat = HalPixelFormat(0x10);
pub const HAL_PIXEL_FORMAT_YCRCB_420_SP: HalPixelFormat = HalPixelFormat(0x11);
pub const HAL_PIXEL_FORMAT_YCBCR_422_I: HalPixelFormat = HalPixelFormat(0x14);
pub const HAL_PIXEL_FORMAT_RGBA_1010102: HalPixelFormat = HalPixelFormat(0x2b);
pub const HAL_PIXEL_FORMAT_YV12: HalPixelFormat = HalPixelFormat(0x32315659);

pub const HAL_PIXEL_FORMAT_NV12_ENCODEABLE: HalPixelFormat = HalPixelFormat(0x102);
pub const HAL_PIXEL_FORMAT_YCBCR_420_SP: HalPixelFormat = HalPixelFormat(0x109);
pub const HAL_PIXEL_FORMAT_YCRCB_420_SP_VENUS: HalPixelFormat = HalPixelFormat(0x114);
pub const HAL_PIXEL_FORMAT_BGR_565: HalPixelFormat = HalPixelFormat(0x115);
pub const HAL_PIXEL_FORMAT_BGRX_8888: HalPixelFormat = HalPixelFormat(0x116);
pub const HAL_PIXEL_FORMAT_ARGB_2101010: HalPixelFormat = HalPixelFormat(0x117);
pub const HAL_PIXEL_FORMAT_RGBX_1010102: HalPixelFormat = HalPixelFormat(0x118);
pub const HAL_PIXEL_FORMAT_XRGB_2101010: HalPixelFormat = HalPixelFormat(0x119);
pub const HAL_PIXEL_FORMAT_BGRA_1010102: HalPixelFormat = HalPixelFormat(0x11a);
pub const HAL_PIXEL_FORMAT_ABGR_2101010: HalPixelFormat = HalPixelFormat(0x11b);
pub const HAL_PIXEL_FORMAT_BGRX_1010102: HalPixelFormat = HalPixelFormat(0x11c);
pub const HAL_PIXEL_FORMAT_XBGR_2101010: HalPixelFormat = HalPixelFormat(0x11d);
pub const HAL_PIXEL_FORMAT_YCBCR_420_SP_VENUS: HalPixelFormat = HalPixelFormat(0x7fa30c04);
pub const HAL_PIXEL_FORMAT_YCBCR_420_SP_VENUS_UBWC: HalPixelFormat = HalPixelFormat(0x7fa30c06);
pub const HAL_PIXEL_FORMAT_YCBCR_420_TP10_UBWC: HalPixelFormat = HalPixelFormat(0x7fa30c09);
pub const HAL_PIXEL_FORMAT_YCBCR_420_P010: HalPixelFormat = HalPixelFormat(0x7fa30c0a);

/// A host pixel-format code.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct HalPixelFormat(pub u32);

impl From<u32> for HalPixelFormat {
    fn from(u: u32) -> HalPixelFormat {
        HalPixelFormat(u)
    }
}

impl From<HalPixelFormat> for u32 {
    fn from(f: HalPixelFormat) -> u32 {
        f.0
    }
}

impl fmt::Debug for HalPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "hal_format(0x{:x})", self.0)
    }
}

/// The display manager's buffer format enumeration.  `Invalid` is the explicit
/// unsupported sentinel; it never round-trips back to the host.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BufferFormat {
    Argb8888,
    Rgba8888,
    Rgba5551,
    Rgba4444,
    Bgra8888,
    Rgbx8888,
    Bgrx8888,
    Rgb888,
    Rgb565,
    Bgr565,
    Rgba1010102,
    Argb2101010,
    Rgbx1010102,
    Xrgb2101010,
    Bgra1010102,
    Abgr2101010,
    Bgrx1010102,
    Xbgr2101010,
    YCbCr420SemiPlanar,
    YCrCb420SemiPlanar,
    YCbCr420SemiPlanarVenus,
    YCrCb420SemiPlanarVenus,
    YCrCb420PlanarStride16,
    YCbCr422H2V1SemiPlanar,
    YCbCr422H2V1Packed,
    YCbCr420P010,
    Rgba8888Ubwc,
    Rgbx8888Ubwc,
    Bgr565Ubwc,
    Rgba1010102Ubwc,
    Rgbx1010102Ubwc,
    YCbCr420SpVenusUbwc,
    YCbCr420Tp10Ubwc,
    #[default]
    Invalid,
}

impl BufferFormat {
    /// Returns true for the hardware-compressed layouts.
    pub fn is_ubwc(self) -> bool {
        matches!(
            self,
            BufferFormat::Rgba8888Ubwc
                | BufferFormat::Rgbx8888Ubwc
                | BufferFormat::Bgr565Ubwc
                | BufferFormat::Rgba1010102Ubwc
                | BufferFormat::Rgbx1010102Ubwc
                | BufferFormat::YCbCr420SpVenusUbwc
                | BufferFormat::YCbCr420Tp10Ubwc
        )
    }

    /// Returns true for the YUV layouts, which take the video pipes.
    pub fn is_yuv(self) -> bool {
        matches!(
            self,
            BufferFormat::YCbCr420SemiPlanar
                | BufferFormat::YCrCb420SemiPlanar
                | BufferFormat::YCbCr420SemiPlanarVenus
                | BufferFormat::YCrCb420SemiPlanarVenus
                | BufferFormat::YCrCb420PlanarStride16
                | BufferFormat::YCbCr422H2V1SemiPlanar
                | BufferFormat::YCbCr422H2V1Packed
                | BufferFormat::YCbCr420P010
                | BufferFormat::YCbCr420SpVenusUbwc
                | BufferFormat::YCbCr420Tp10Ubwc
        )
    }
}

/// One row of the format translation table: a host code, its linear internal format, and
/// the compressed internal format when the layout has one.
struct FormatMapping {
    hal: HalPixelFormat,
    linear: BufferFormat,
    ubwc: Option<BufferFormat>,
}

static FORMAT_TABLE: [FormatMapping; 28] = [
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGBA_8888,
        linear: BufferFormat::Rgba8888,
        ubwc: Some(BufferFormat::Rgba8888Ubwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGBA_5551,
        linear: BufferFormat::Rgba5551,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGBA_4444,
        linear: BufferFormat::Rgba4444,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_BGRA_8888,
        linear: BufferFormat::Bgra8888,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGBX_8888,
        linear: BufferFormat::Rgbx8888,
        ubwc: Some(BufferFormat::Rgbx8888Ubwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_BGRX_8888,
        linear: BufferFormat::Bgrx8888,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGB_888,
        linear: BufferFormat::Rgb888,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGB_565,
        linear: BufferFormat::Rgb565,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_BGR_565,
        linear: BufferFormat::Bgr565,
        ubwc: Some(BufferFormat::Bgr565Ubwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_NV12_ENCODEABLE,
        linear: BufferFormat::YCbCr420SemiPlanarVenus,
        ubwc: Some(BufferFormat::YCbCr420SpVenusUbwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_420_SP_VENUS,
        linear: BufferFormat::YCbCr420SemiPlanarVenus,
        ubwc: Some(BufferFormat::YCbCr420SpVenusUbwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCRCB_420_SP_VENUS,
        linear: BufferFormat::YCrCb420SemiPlanarVenus,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_420_SP_VENUS_UBWC,
        linear: BufferFormat::YCbCr420SpVenusUbwc,
        ubwc: Some(BufferFormat::YCbCr420SpVenusUbwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YV12,
        linear: BufferFormat::YCrCb420PlanarStride16,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCRCB_420_SP,
        linear: BufferFormat::YCrCb420SemiPlanar,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_420_SP,
        linear: BufferFormat::YCbCr420SemiPlanar,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_422_SP,
        linear: BufferFormat::YCbCr422H2V1SemiPlanar,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_422_I,
        linear: BufferFormat::YCbCr422H2V1Packed,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGBA_1010102,
        linear: BufferFormat::Rgba1010102,
        ubwc: Some(BufferFormat::Rgba1010102Ubwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_ARGB_2101010,
        linear: BufferFormat::Argb2101010,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_RGBX_1010102,
        linear: BufferFormat::Rgbx1010102,
        ubwc: Some(BufferFormat::Rgbx1010102Ubwc),
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_XRGB_2101010,
        linear: BufferFormat::Xrgb2101010,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_BGRA_1010102,
        linear: BufferFormat::Bgra1010102,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_ABGR_2101010,
        linear: BufferFormat::Abgr2101010,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_BGRX_1010102,
        linear: BufferFormat::Bgrx1010102,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_XBGR_2101010,
        linear: BufferFormat::Xbgr2101010,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_420_P010,
        linear: BufferFormat::YCbCr420P010,
        ubwc: None,
    },
    FormatMapping {
        hal: HAL_PIXEL_FORMAT_YCBCR_420_TP10_UBWC,
        linear: BufferFormat::YCbCr420Tp10Ubwc,
        ubwc: None,
    },
];

/// Translates a host pixel-format code into the internal format enumeration.  With
/// `ubwc_aligned` set, only formats with a compressed layout translate; everything else
/// is logged and mapped to `BufferFormat::Invalid`.
pub fn buffer_format(hal: HalPixelFormat, ubwc_aligned: bool) -> BufferFormat {
    let mapping = match FORMAT_TABLE.iter().find(|m| m.hal == hal) {
        Some(mapping) => mapping,
        None => {
            warn!("unsupported pixel format {:?}", hal);
            return BufferFormat::Invalid;
        }
    };

    if ubwc_aligned {
        match mapping.ubwc {
            Some(format) => format,
            None => {
                warn!("unsupported pixel format {:?} for UBWC", hal);
                BufferFormat::Invalid
            }
        }
    } else {
        mapping.linear
    }
}
