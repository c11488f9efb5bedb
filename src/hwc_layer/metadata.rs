// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! metadata: The vendor per-buffer metadata blob and its translation into internal
//! layer attributes.  The blob layout is fixed by the vendor gralloc; producers write it
//! into a page shared with the buffer and consumers read whichever fields the operation
//! mask marks as set.

use log::warn;
use zerocopy::AsBytes;
use zerocopy::FromBytes;

use crate::hwc_layer::layer::LayerCsc;
use crate::hwc_layer::layer::LayerIgc;
use crate::hwc_layer::layer::S3dFormat;

/// Operation mask bits, one per metadata field.
pub const METADATA_OP_BUFFER_GEOMETRY: u32 = 1 << 0;
pub const METADATA_OP_COLOR_SPACE: u32 = 1 << 1;
pub const METADATA_OP_IGC: u32 = 1 << 2;
pub const METADATA_OP_REFRESH_RATE: u32 = 1 << 3;
pub const METADATA_OP_INTERLACED: u32 = 1 << 4;
pub const METADATA_OP_LINEAR_FORMAT: u32 = 1 << 5;
pub const METADATA_OP_S3D_FORMAT: u32 = 1 << 6;

/// Color space codes, fixed by the vendor metadata contract.
pub const COLOR_SPACE_ITU_R_601: u32 = 0;
pub const COLOR_SPACE_ITU_R_601_FR: u32 = 1;
pub const COLOR_SPACE_ITU_R_709: u32 = 2;

/// Inverse gamma correction codes.
pub const IGC_NOT_SPECIFIED: u32 = 0;
pub const IGC_SRGB: u32 = 1;

/// Stereoscopic layout codes.
pub const S3D_FORMAT_NONE: u32 = 0;
pub const S3D_FORMAT_LEFT_RIGHT: u32 = 1;
pub const S3D_FORMAT_RIGHT_LEFT: u32 = 2;
pub const S3D_FORMAT_TOP_BOTTOM: u32 = 4;

/// The dimensions a producer rendered at, which may exceed the nominal buffer
/// dimensions due to codec alignment.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, AsBytes, FromBytes)]
pub struct BufferDim {
    pub width: i32,
    pub height: i32,
}

/// The vendor metadata blob.  All fields are only meaningful when the matching
/// operation bit is set.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, AsBytes, FromBytes)]
pub struct BufferMetadata {
    pub operation: u32,
    pub interlaced: i32,
    pub buffer_geometry: BufferDim,
    pub refresh_rate: f32,
    pub color_space: u32,
    pub igc: u32,
    pub linear_format: u32,
    pub s3d_format: u32,
}

impl BufferMetadata {
    fn has(&self, op: u32) -> bool {
        self.operation & op != 0
    }

    pub fn buffer_geometry(&self) -> Option<BufferDim> {
        self.has(METADATA_OP_BUFFER_GEOMETRY)
            .then_some(self.buffer_geometry)
    }

    pub fn color_space(&self) -> Option<u32> {
        self.has(METADATA_OP_COLOR_SPACE).then_some(self.color_space)
    }

    pub fn igc(&self) -> Option<u32> {
        self.has(METADATA_OP_IGC).then_some(self.igc)
    }

    pub fn refresh_rate(&self) -> Option<f32> {
        self.has(METADATA_OP_REFRESH_RATE)
            .then_some(self.refresh_rate)
    }

    pub fn interlaced(&self) -> Option<bool> {
        self.has(METADATA_OP_INTERLACED)
            .then_some(self.interlaced != 0)
    }

    pub fn linear_format(&self) -> Option<u32> {
        self.has(METADATA_OP_LINEAR_FORMAT)
            .then_some(self.linear_format)
    }

    pub fn s3d_format(&self) -> Option<u32> {
        self.has(METADATA_OP_S3D_FORMAT).then_some(self.s3d_format)
    }

    /// Reads a metadata blob from the head of a shared metadata page.
    pub fn read_from_page(page: &[u8]) -> Option<BufferMetadata> {
        BufferMetadata::read_from_prefix(page)
    }

    /// Writes the blob to the head of a shared metadata page.  Returns false if the
    /// page is too small.
    pub fn write_to_page(&self, page: &mut [u8]) -> bool {
        self.write_to_prefix(page).is_some()
    }
}

/// Translates a vendor color-space code.  Unsupported codes are logged and yield `None`;
/// the caller keeps its previous color setup.
pub fn csc_from_color_space(color_space: u32) -> Option<LayerCsc> {
    match color_space {
        COLOR_SPACE_ITU_R_601 => Some(LayerCsc::LimitedRange601),
        COLOR_SPACE_ITU_R_601_FR => Some(LayerCsc::FullRange601),
        COLOR_SPACE_ITU_R_709 => Some(LayerCsc::LimitedRange709),
        _ => {
            warn!("unsupported color space: {}", color_space);
            None
        }
    }
}

/// Translates a vendor gamma code.  Unsupported codes are logged and yield `None`.
pub fn igc_from_metadata(igc: u32) -> Option<LayerIgc> {
    match igc {
        IGC_NOT_SPECIFIED => Some(LayerIgc::NotSpecified),
        IGC_SRGB => Some(LayerIgc::Srgb),
        _ => {
            warn!("unsupported IGC: {}", igc);
            None
        }
    }
}

/// Translates a vendor stereo-layout code.  Invalid codes are logged and map to the
/// non-stereo layout.
pub fn s3d_from_metadata(s3d: u32) -> S3dFormat {
    match s3d {
        S3D_FORMAT_NONE => S3dFormat::None,
        S3D_FORMAT_LEFT_RIGHT => S3dFormat::LeftRight,
        S3D_FORMAT_RIGHT_LEFT => S3dFormat::RightLeft,
        S3D_FORMAT_TOP_BOTTOM => S3dFormat::TopBottom,
        _ => {
            warn!("invalid S3D format: {}", s3d);
            S3dFormat::None
        }
    }
}

/// Video frame rates fluctuate around the standard rates; a rate within 2 below a
/// standard rate snaps up to it.
pub fn round_to_standard_fps(fps: f32) -> u32 {
    const STANDARD_FPS: [u32; 4] = [24, 30, 48, 60];

    let frame_rate = fps as u32;
    for standard in STANDARD_FPS {
        if standard >= frame_rate && standard - frame_rate < 2 {
            return standard;
        }
    }

    frame_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_snaps_to_standard_rates() {
        assert_eq!(round_to_standard_fps(23.976), 24);
        assert_eq!(round_to_standard_fps(29.0), 30);
        assert_eq!(round_to_standard_fps(30.0), 30);
        assert_eq!(round_to_standard_fps(47.9), 48);
        assert_eq!(round_to_standard_fps(59.94), 60);
    }

    #[test]
    fn fps_passes_through_off_rates() {
        assert_eq!(round_to_standard_fps(15.0), 15);
        assert_eq!(round_to_standard_fps(31.0), 31);
        assert_eq!(round_to_standard_fps(61.0), 61);
        assert_eq!(round_to_standard_fps(120.0), 120);
    }

    #[test]
    fn unset_fields_read_as_none() {
        let metadata = BufferMetadata {
            operation: METADATA_OP_COLOR_SPACE,
            color_space: COLOR_SPACE_ITU_R_709,
            refresh_rate: 60.0,
            ..Default::default()
        };

        assert_eq!(metadata.color_space(), Some(COLOR_SPACE_ITU_R_709));
        assert_eq!(metadata.refresh_rate(), None);
        assert_eq!(metadata.buffer_geometry(), None);
        assert_eq!(metadata.interlaced(), None);
    }

    #[test]
    fn color_space_translation() {
        assert_eq!(
            csc_from_color_space(COLOR_SPACE_ITU_R_601),
            Some(LayerCsc::LimitedRange601)
        );
        assert_eq!(
            csc_from_color_space(COLOR_SPACE_ITU_R_601_FR),
            Some(LayerCsc::FullRange601)
        );
        assert_eq!(
            csc_from_color_space(COLOR_SPACE_ITU_R_709),
            Some(LayerCsc::LimitedRange709)
        );
        assert_eq!(csc_from_color_space(99), None);
    }

    #[test]
    fn s3d_translation_defaults_to_none() {
        assert_eq!(s3d_from_metadata(S3D_FORMAT_LEFT_RIGHT), S3dFormat::LeftRight);
        assert_eq!(s3d_from_metadata(S3D_FORMAT_TOP_BOTTOM), S3dFormat::TopBottom);
        assert_eq!(s3d_from_metadata(3), S3dFormat::None);
    }

    #[test]
    fn blob_round_trips_through_a_page() {
        let metadata = BufferMetadata {
            operation: METADATA_OP_REFRESH_RATE | METADATA_OP_INTERLACED,
            refresh_rate: 29.97,
            interlaced: 1,
            ..Default::default()
        };

        let mut page = [0u8; 4096];
        assert!(metadata.write_to_page(&mut page));

        let read_back = BufferMetadata::read_from_page(&page).unwrap();
        assert_eq!(read_back, metadata);
        assert_eq!(read_back.interlaced(), Some(true));
    }
}
