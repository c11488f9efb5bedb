// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! layer: Per-layer adaptation of host display-API state into the display manager's
//! layer representation, with change tracking for the host's validation pass.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use log::debug;
use log::error;

use crate::hwc_layer::buffer::BufferHandle;
use crate::hwc_layer::buffer::LayerBuffer;
use crate::hwc_layer::fence::ReleaseFenceQueue;
use crate::hwc_layer::fence::SyncFence;
use crate::hwc_layer::formats::buffer_format;
use crate::hwc_layer::formats::BufferFormat;
use crate::hwc_layer::formats::HalPixelFormat;
use crate::hwc_layer::metadata::csc_from_color_space;
use crate::hwc_layer::metadata::igc_from_metadata;
use crate::hwc_layer::metadata::round_to_standard_fps;
use crate::hwc_layer::metadata::s3d_from_metadata;
use crate::hwc_os::AsRawDescriptor;
use crate::hwc_os::Descriptor;
use crate::hwc_os::RawDescriptor;
use crate::hwc_os::SafeDescriptor;
use crate::hwc_utils::Color;
use crate::hwc_utils::FRect;
use crate::hwc_utils::HwcError;
use crate::hwc_utils::HwcResult;
use crate::hwc_utils::LayerRect;
use crate::hwc_utils::Rect;

/// Geometry attributes whose change forces the host to re-validate the display.
pub const GEOMETRY_CHANGE_BLEND_MODE: u32 = 1 << 0;
pub const GEOMETRY_CHANGE_DATASPACE: u32 = 1 << 1;
pub const GEOMETRY_CHANGE_DISPLAY_FRAME: u32 = 1 << 2;
pub const GEOMETRY_CHANGE_PLANE_ALPHA: u32 = 1 << 3;
pub const GEOMETRY_CHANGE_SOURCE_CROP: u32 = 1 << 4;
pub const GEOMETRY_CHANGE_TRANSFORM: u32 = 1 << 5;
pub const GEOMETRY_CHANGE_Z_ORDER: u32 = 1 << 6;

/// Bitmask of geometric/blend attributes changed since the previous frame.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GeometryChanges(pub u32);

impl GeometryChanges {
    fn mark(&mut self, change: u32) {
        self.0 |= change;
    }

    pub fn contains(self, change: u32) -> bool {
        self.0 & change != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Blend modes as passed by the host display API.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlendMode {
    None = 1,
    Premultiplied = 2,
    Coverage = 3,
}

impl TryFrom<i32> for BlendMode {
    type Error = HwcError;

    fn try_from(mode: i32) -> HwcResult<BlendMode> {
        match mode {
            1 => Ok(BlendMode::None),
            2 => Ok(BlendMode::Premultiplied),
            3 => Ok(BlendMode::Coverage),
            _ => Err(HwcError::InvalidLayerParameter("blend mode")),
        }
    }
}

/// Composition types shared with the host display API.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompositionType {
    Client = 1,
    Device = 2,
    SolidColor = 3,
    Cursor = 4,
    Sideband = 5,
}

impl TryFrom<i32> for CompositionType {
    type Error = HwcError;

    fn try_from(composition: i32) -> HwcResult<CompositionType> {
        match composition {
            1 => Ok(CompositionType::Client),
            2 => Ok(CompositionType::Device),
            3 => Ok(CompositionType::SolidColor),
            4 => Ok(CompositionType::Cursor),
            5 => Ok(CompositionType::Sideband),
            _ => Err(HwcError::InvalidLayerParameter("composition type")),
        }
    }
}

/// Transforms as passed by the host display API.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayTransform {
    None = 0,
    FlipH = 1,
    FlipV = 2,
    Rotate180 = 3,
    Rotate90 = 4,
    FlipHRotate90 = 5,
    FlipVRotate90 = 6,
    Rotate270 = 7,
}

impl TryFrom<i32> for DisplayTransform {
    type Error = HwcError;

    fn try_from(transform: i32) -> HwcResult<DisplayTransform> {
        match transform {
            0 => Ok(DisplayTransform::None),
            1 => Ok(DisplayTransform::FlipH),
            2 => Ok(DisplayTransform::FlipV),
            3 => Ok(DisplayTransform::Rotate180),
            4 => Ok(DisplayTransform::Rotate90),
            5 => Ok(DisplayTransform::FlipHRotate90),
            6 => Ok(DisplayTransform::FlipVRotate90),
            7 => Ok(DisplayTransform::Rotate270),
            _ => Err(HwcError::InvalidLayerParameter("transform")),
        }
    }
}

/// The display manager's blending enumeration.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LayerBlending {
    Opaque,
    #[default]
    Premultiplied,
    Coverage,
}

/// The display manager's transform representation: an optional 90 degree rotation plus
/// flips, applied rotation first.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LayerTransform {
    pub rot90: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

/// Color space conversion selected for the buffer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LayerCsc {
    #[default]
    LimitedRange601,
    FullRange601,
    LimitedRange709,
}

/// Inverse gamma correction selected for the buffer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LayerIgc {
    #[default]
    NotSpecified,
    Srgb,
}

/// Stereoscopic layout of the buffer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum S3dFormat {
    #[default]
    None,
    LeftRight,
    RightLeft,
    TopBottom,
}

/// The composition the display manager picked for a layer during validation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LayerComposition {
    /// The layer falls back to GPU composition.
    Gpu,
    /// The layer goes to a hardware pipe.
    Device,
    /// The layer rides the cursor pipe.
    Cursor,
}

/// Flags the display manager keeps per layer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LayerFlags {
    pub solid_fill: bool,
}

/// The display manager's layer record.
#[derive(Default)]
pub struct Layer {
    pub input_buffer: LayerBuffer,
    pub src_rect: LayerRect,
    pub dst_rect: LayerRect,
    pub visible_regions: Vec<LayerRect>,
    pub dirty_regions: Vec<LayerRect>,
    pub blending: LayerBlending,
    pub transform: LayerTransform,
    pub plane_alpha: u8,
    pub solid_fill_color: u32,
    pub frame_rate: u32,
    pub flags: LayerFlags,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Owns one layer's state on behalf of the host composer, translating every host
/// display-API call into the display manager's representation.
pub struct HwcLayer {
    id: u64,
    display_id: u64,
    layer: Layer,
    z_order: u32,
    dataspace: i32,
    client_requested: CompositionType,
    device_selected: CompositionType,
    geometry_changes: GeometryChanges,
    needs_validate: bool,
    plane_descriptor: Option<SafeDescriptor>,
    release_fences: ReleaseFenceQueue,
}

impl HwcLayer {
    pub fn new(display_id: u64) -> HwcLayer {
        let mut release_fences = ReleaseFenceQueue::new();
        // Fences are deferred by one cycle, so the first presentation reports no fence.
        release_fences.push(None);

        HwcLayer {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            display_id,
            layer: Layer {
                plane_alpha: 0xff,
                ..Default::default()
            },
            z_order: 0,
            dataspace: 0,
            client_requested: CompositionType::Device,
            device_selected: CompositionType::Device,
            geometry_changes: GeometryChanges::default(),
            needs_validate: false,
            plane_descriptor: None,
            release_fences,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn display_id(&self) -> u64 {
        self.display_id
    }

    /// Accepts the next input buffer and its acquire fence.
    ///
    /// The plane descriptor is dup'd out of the handle since the host may reuse the
    /// handle before the display is done with the buffer; the dup replaces (and closes)
    /// the previous one.  Ownership of a valid acquire fence transfers to the layer.
    pub fn set_buffer(
        &mut self,
        buffer: Option<&BufferHandle>,
        acquire_fence: RawDescriptor,
    ) -> HwcResult<()> {
        let handle = match buffer {
            Some(handle) if handle.fd >= 0 => handle,
            _ => {
                error!("invalid buffer handle on layer: {}", self.id);
                return Err(HwcError::InvalidBufferHandle);
            }
        };

        if acquire_fence == 0 {
            error!("acquire fence is zero on layer: {}", self.id);
            return Err(HwcError::InvalidFence);
        }

        let plane_descriptor = SafeDescriptor::try_from(&Descriptor(handle.fd) as &dyn AsRawDescriptor)
            .map_err(|_| HwcError::InvalidBufferHandle)?;

        let input_buffer = &mut self.layer.input_buffer;
        input_buffer.width = handle.width as u32;
        input_buffer.height = handle.height as u32;
        input_buffer.format = buffer_format(handle.format, handle.is_ubwc_aligned());

        input_buffer.flags.video = handle.is_video();
        input_buffer.flags.secure = handle.is_secure();
        input_buffer.flags.secure_display = handle.is_secure_display();

        input_buffer.plane.fd = plane_descriptor.as_raw_descriptor();
        input_buffer.plane.offset = handle.offset;
        input_buffer.plane.stride = handle.width as u32;
        input_buffer.acquire_fence = SyncFence::from_raw(acquire_fence)?;
        input_buffer.id = handle.id;

        self.plane_descriptor = Some(plane_descriptor);
        self.apply_metadata(handle);

        Ok(())
    }

    /// Applies the vendor metadata carried by the handle.  Unsupported values are logged
    /// by the translation helpers and leave the previous state in place.
    fn apply_metadata(&mut self, handle: &BufferHandle) {
        let metadata = &handle.metadata;
        let input_buffer = &mut self.layer.input_buffer;

        if let Some(geometry) = metadata.buffer_geometry() {
            input_buffer.width = geometry.width as u32;
            input_buffer.height = geometry.height as u32;
        }

        if let Some(csc) = metadata.color_space().and_then(csc_from_color_space) {
            input_buffer.csc = csc;
        }

        if let Some(igc) = metadata.igc().and_then(igc_from_metadata) {
            input_buffer.igc = igc;
        }

        if let Some(fps) = metadata.refresh_rate() {
            self.layer.frame_rate = round_to_standard_fps(fps);
        }

        if let Some(interlaced) = metadata.interlaced() {
            input_buffer.flags.interlace = interlaced;
        }

        if let Some(linear_format) = metadata.linear_format() {
            input_buffer.format = buffer_format(HalPixelFormat(linear_format), false);
        }

        if let Some(s3d) = metadata.s3d_format() {
            input_buffer.s3d_format = s3d_from_metadata(s3d);
        }
    }

    /// Replaces the dirty regions.  Any change in the damage set forces the host to
    /// re-validate.
    pub fn set_surface_damage(&mut self, damage: &[Rect]) {
        if self.layer.dirty_regions.len() != damage.len() {
            self.needs_validate = true;
        } else {
            for (previous, rect) in self.layer.dirty_regions.iter().zip(damage) {
                if *previous != LayerRect::from(*rect) {
                    self.needs_validate = true;
                    break;
                }
            }
        }

        self.layer.dirty_regions.clear();
        self.layer
            .dirty_regions
            .extend(damage.iter().map(|rect| LayerRect::from(*rect)));
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        let blending = match mode {
            BlendMode::Coverage => LayerBlending::Coverage,
            BlendMode::Premultiplied => LayerBlending::Premultiplied,
            BlendMode::None => LayerBlending::Opaque,
        };

        if self.layer.blending != blending {
            self.geometry_changes.mark(GEOMETRY_CHANGE_BLEND_MODE);
            self.layer.blending = blending;
        }
    }

    /// Stores the solid fill color.  Solid fill renders through the ARGB8888 pipe.
    pub fn set_color(&mut self, color: Color) {
        self.layer.solid_fill_color = color.to_argb();
        self.layer.input_buffer.format = BufferFormat::Argb8888;
        debug!(
            "[{}][{}] layer color set to {:x}",
            self.display_id, self.id, self.layer.solid_fill_color
        );
    }

    pub fn set_composition_type(&mut self, composition: CompositionType) -> HwcResult<()> {
        match composition {
            CompositionType::Client | CompositionType::Device | CompositionType::Cursor => {
                self.layer.flags.solid_fill = false;
            }
            CompositionType::SolidColor => {
                self.layer.flags.solid_fill = true;
            }
            CompositionType::Sideband => return Err(HwcError::Unsupported),
        }

        self.client_requested = composition;
        Ok(())
    }

    pub fn set_dataspace(&mut self, dataspace: i32) {
        if self.dataspace != dataspace {
            self.geometry_changes.mark(GEOMETRY_CHANGE_DATASPACE);
            self.dataspace = dataspace;
        }
    }

    pub fn set_display_frame(&mut self, frame: Rect) {
        let dst_rect = LayerRect::from(frame);
        if self.layer.dst_rect != dst_rect {
            self.geometry_changes.mark(GEOMETRY_CHANGE_DISPLAY_FRAME);
            self.layer.dst_rect = dst_rect;
        }
    }

    /// Stores the plane alpha, converted from the host's 0.0 to 1.0 range.
    pub fn set_plane_alpha(&mut self, alpha: f32) {
        let plane_alpha = (255.0 * alpha).round() as u8;
        if self.layer.plane_alpha != plane_alpha {
            self.geometry_changes.mark(GEOMETRY_CHANGE_PLANE_ALPHA);
            self.layer.plane_alpha = plane_alpha;
        }
    }

    pub fn set_source_crop(&mut self, crop: FRect) {
        let src_rect = LayerRect::from(crop);
        if self.layer.src_rect != src_rect {
            self.geometry_changes.mark(GEOMETRY_CHANGE_SOURCE_CROP);
            self.layer.src_rect = src_rect;
        }
    }

    pub fn set_transform(&mut self, transform: DisplayTransform) {
        let layer_transform = match transform {
            DisplayTransform::None => LayerTransform::default(),
            DisplayTransform::FlipH => LayerTransform {
                flip_horizontal: true,
                ..Default::default()
            },
            DisplayTransform::FlipV => LayerTransform {
                flip_vertical: true,
                ..Default::default()
            },
            DisplayTransform::Rotate180 => LayerTransform {
                flip_horizontal: true,
                flip_vertical: true,
                ..Default::default()
            },
            DisplayTransform::Rotate90 => LayerTransform {
                rot90: true,
                ..Default::default()
            },
            DisplayTransform::FlipHRotate90 => LayerTransform {
                rot90: true,
                flip_horizontal: true,
                ..Default::default()
            },
            DisplayTransform::FlipVRotate90 => LayerTransform {
                rot90: true,
                flip_vertical: true,
                ..Default::default()
            },
            DisplayTransform::Rotate270 => LayerTransform {
                rot90: true,
                flip_horizontal: true,
                flip_vertical: true,
            },
        };

        if self.layer.transform != layer_transform {
            self.geometry_changes.mark(GEOMETRY_CHANGE_TRANSFORM);
            self.layer.transform = layer_transform;
        }
    }

    /// Replaces the visible regions.  Visibility alone does not force re-validation.
    pub fn set_visible_region(&mut self, visible: &[Rect]) {
        self.layer.visible_regions.clear();
        self.layer
            .visible_regions
            .extend(visible.iter().map(|rect| LayerRect::from(*rect)));
    }

    pub fn set_z_order(&mut self, z: u32) {
        if self.z_order != z {
            self.geometry_changes.mark(GEOMETRY_CHANGE_Z_ORDER);
            self.z_order = z;
        }
    }

    /// Resolves the composition reported back to the host from the display manager's
    /// validation result.  Resolution priority: an explicit client request wins, then
    /// the GPU fallback, then the solid-fill override, then device composition.
    pub fn update_composition(&mut self, composition: LayerComposition) {
        let mut selected = match composition {
            LayerComposition::Gpu => CompositionType::Client,
            LayerComposition::Cursor => CompositionType::Cursor,
            LayerComposition::Device => CompositionType::Device,
        };

        if selected == CompositionType::Device && self.layer.flags.solid_fill {
            selected = CompositionType::SolidColor;
        }

        if self.client_requested == CompositionType::Client {
            selected = CompositionType::Client;
        }

        self.device_selected = selected;
    }

    /// Queues a release fence for the presentation cycle that just retired.
    pub fn push_release_fence(&mut self, fence: Option<SyncFence>) {
        self.release_fences.push(fence);
    }

    /// Transfers out the release fence for the oldest pending cycle.
    pub fn pop_release_fence(&mut self) -> Option<SyncFence> {
        self.release_fences.pop()
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn z_order(&self) -> u32 {
        self.z_order
    }

    pub fn dataspace(&self) -> i32 {
        self.dataspace
    }

    pub fn client_requested(&self) -> CompositionType {
        self.client_requested
    }

    pub fn device_selected(&self) -> CompositionType {
        self.device_selected
    }

    pub fn geometry_changes(&self) -> GeometryChanges {
        self.geometry_changes
    }

    /// Clears the change mask once the host's validation pass has consumed it.
    pub fn clear_geometry_changes(&mut self) {
        self.geometry_changes.clear();
    }

    pub fn needs_validate(&self) -> bool {
        self.needs_validate
    }

    pub fn clear_needs_validate(&mut self) {
        self.needs_validate = false;
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;

    use nix::unistd::pipe;

    use super::*;
    use crate::hwc_layer::buffer::BufferFlags;
    use crate::hwc_layer::buffer::BUFFER_TYPE_VIDEO;
    use crate::hwc_layer::buffer::PRIV_FLAGS_SECURE_BUFFER;
    use crate::hwc_layer::buffer::PRIV_FLAGS_UBWC_ALIGNED;
    use crate::hwc_layer::formats::HAL_PIXEL_FORMAT_RGBA_8888;
    use crate::hwc_layer::formats::HAL_PIXEL_FORMAT_YCBCR_420_SP_VENUS;
    use crate::hwc_layer::metadata::BufferDim;
    use crate::hwc_layer::metadata::BufferMetadata;
    use crate::hwc_layer::metadata::COLOR_SPACE_ITU_R_709;
    use crate::hwc_layer::metadata::METADATA_OP_BUFFER_GEOMETRY;
    use crate::hwc_layer::metadata::METADATA_OP_COLOR_SPACE;
    use crate::hwc_layer::metadata::METADATA_OP_INTERLACED;
    use crate::hwc_layer::metadata::METADATA_OP_REFRESH_RATE;
    use crate::hwc_layer::metadata::METADATA_OP_S3D_FORMAT;
    use crate::hwc_layer::metadata::S3D_FORMAT_TOP_BOTTOM;

    fn test_handle(file: &File, format: HalPixelFormat, flags: u32) -> BufferHandle {
        BufferHandle {
            fd: file.as_raw_fd(),
            size: 4096,
            offset: 128,
            buffer_type: BUFFER_TYPE_VIDEO,
            width: 64,
            height: 32,
            format,
            flags,
            id: 7,
            metadata: BufferMetadata::default(),
        }
    }

    #[test]
    fn layer_ids_are_unique() {
        let first = HwcLayer::new(0);
        let second = HwcLayer::new(0);
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn geometry_bits_set_only_on_change() {
        let mut layer = HwcLayer::new(0);
        assert!(layer.geometry_changes().is_empty());

        let frame = Rect {
            left: 0,
            top: 0,
            right: 1920,
            bottom: 1080,
        };
        layer.set_display_frame(frame);
        assert!(layer
            .geometry_changes()
            .contains(GEOMETRY_CHANGE_DISPLAY_FRAME));

        layer.clear_geometry_changes();
        layer.set_display_frame(frame);
        assert!(layer.geometry_changes().is_empty());

        layer.set_z_order(2);
        layer.set_dataspace(0x8c2);
        layer.set_blend_mode(BlendMode::Coverage);
        layer.set_plane_alpha(0.5);
        layer.set_transform(DisplayTransform::Rotate90);
        layer.set_source_crop(FRect {
            left: 0.0,
            top: 0.0,
            right: 64.0,
            bottom: 32.0,
        });

        let changes = layer.geometry_changes();
        assert!(changes.contains(GEOMETRY_CHANGE_Z_ORDER));
        assert!(changes.contains(GEOMETRY_CHANGE_DATASPACE));
        assert!(changes.contains(GEOMETRY_CHANGE_BLEND_MODE));
        assert!(changes.contains(GEOMETRY_CHANGE_PLANE_ALPHA));
        assert!(changes.contains(GEOMETRY_CHANGE_TRANSFORM));
        assert!(changes.contains(GEOMETRY_CHANGE_SOURCE_CROP));
    }

    #[test]
    fn plane_alpha_converts_to_byte_range() {
        let mut layer = HwcLayer::new(0);
        layer.set_plane_alpha(0.0);
        assert_eq!(layer.layer().plane_alpha, 0);

        layer.set_plane_alpha(1.0);
        assert_eq!(layer.layer().plane_alpha, 255);

        layer.set_plane_alpha(0.5);
        assert_eq!(layer.layer().plane_alpha, 128);
    }

    #[test]
    fn transform_table() {
        let mut layer = HwcLayer::new(0);

        layer.set_transform(DisplayTransform::FlipH);
        assert_eq!(
            layer.layer().transform,
            LayerTransform {
                flip_horizontal: true,
                ..Default::default()
            }
        );

        layer.set_transform(DisplayTransform::Rotate180);
        assert_eq!(
            layer.layer().transform,
            LayerTransform {
                flip_horizontal: true,
                flip_vertical: true,
                ..Default::default()
            }
        );

        layer.set_transform(DisplayTransform::Rotate270);
        assert_eq!(
            layer.layer().transform,
            LayerTransform {
                rot90: true,
                flip_horizontal: true,
                flip_vertical: true,
            }
        );

        layer.set_transform(DisplayTransform::None);
        assert_eq!(layer.layer().transform, LayerTransform::default());
    }

    #[test]
    fn solid_fill_color_forces_argb8888() {
        let mut layer = HwcLayer::new(0);
        layer.set_color(Color {
            r: 0x10,
            g: 0x20,
            b: 0x30,
            a: 0x40,
        });

        assert_eq!(layer.layer().solid_fill_color, 0x40102030);
        assert_eq!(layer.layer().input_buffer.format, BufferFormat::Argb8888);
    }

    #[test]
    fn composition_resolution_priority() {
        let mut layer = HwcLayer::new(0);

        // Default: the device pipeline keeps the layer.
        layer.update_composition(LayerComposition::Device);
        assert_eq!(layer.device_selected(), CompositionType::Device);

        // GPU fallback.
        layer.update_composition(LayerComposition::Gpu);
        assert_eq!(layer.device_selected(), CompositionType::Client);

        // Cursor pipe.
        layer.update_composition(LayerComposition::Cursor);
        assert_eq!(layer.device_selected(), CompositionType::Cursor);

        // Solid fill override applies to device composition.
        layer
            .set_composition_type(CompositionType::SolidColor)
            .unwrap();
        layer.update_composition(LayerComposition::Device);
        assert_eq!(layer.device_selected(), CompositionType::SolidColor);

        // An explicit client request wins over everything.
        layer.set_composition_type(CompositionType::Client).unwrap();
        layer.update_composition(LayerComposition::Device);
        assert_eq!(layer.device_selected(), CompositionType::Client);
    }

    #[test]
    fn sideband_composition_is_unsupported() {
        let mut layer = HwcLayer::new(0);
        assert!(matches!(
            layer.set_composition_type(CompositionType::Sideband),
            Err(HwcError::Unsupported)
        ));
    }

    #[test]
    fn set_buffer_validates_preconditions() {
        let mut layer = HwcLayer::new(0);

        assert!(matches!(
            layer.set_buffer(None, -1),
            Err(HwcError::InvalidBufferHandle)
        ));

        let file = File::open("/dev/null").unwrap();
        let handle = test_handle(&file, HAL_PIXEL_FORMAT_RGBA_8888, 0);
        assert!(matches!(
            layer.set_buffer(Some(&handle), 0),
            Err(HwcError::InvalidFence)
        ));

        let mut bad_handle = test_handle(&file, HAL_PIXEL_FORMAT_RGBA_8888, 0);
        bad_handle.fd = -1;
        assert!(matches!(
            layer.set_buffer(Some(&bad_handle), -1),
            Err(HwcError::InvalidBufferHandle)
        ));
    }

    #[test]
    fn set_buffer_translates_the_handle() {
        let mut layer = HwcLayer::new(0);
        let file = File::open("/dev/null").unwrap();
        let handle = test_handle(
            &file,
            HAL_PIXEL_FORMAT_RGBA_8888,
            PRIV_FLAGS_UBWC_ALIGNED | PRIV_FLAGS_SECURE_BUFFER,
        );

        layer.set_buffer(Some(&handle), -1).unwrap();

        let input_buffer = &layer.layer().input_buffer;
        assert_eq!(input_buffer.width, 64);
        assert_eq!(input_buffer.height, 32);
        assert_eq!(input_buffer.format, BufferFormat::Rgba8888Ubwc);
        assert_eq!(
            input_buffer.flags,
            BufferFlags {
                video: true,
                secure: true,
                secure_display: false,
                interlace: false,
            }
        );
        assert_eq!(input_buffer.plane.offset, 128);
        assert_eq!(input_buffer.plane.stride, 64);
        assert_eq!(input_buffer.id, 7);
        assert!(input_buffer.acquire_fence.is_none());

        // The plane descriptor is a dup, not the host's descriptor.
        assert_ne!(input_buffer.plane.fd, handle.fd);
    }

    #[test]
    fn set_buffer_takes_the_acquire_fence() {
        let mut layer = HwcLayer::new(0);
        let file = File::open("/dev/null").unwrap();
        let handle = test_handle(&file, HAL_PIXEL_FORMAT_RGBA_8888, 0);

        let (read_end, _write_end) = pipe().unwrap();
        layer.set_buffer(Some(&handle), read_end).unwrap();

        let fence = layer.layer().input_buffer.acquire_fence.as_ref().unwrap();
        assert_eq!(fence.as_raw_descriptor(), read_end);
    }

    #[test]
    fn metadata_overrides_apply() {
        let mut layer = HwcLayer::new(0);
        let file = File::open("/dev/null").unwrap();

        let mut handle = test_handle(&file, HAL_PIXEL_FORMAT_YCBCR_420_SP_VENUS, 0);
        handle.metadata = BufferMetadata {
            operation: METADATA_OP_BUFFER_GEOMETRY
                | METADATA_OP_COLOR_SPACE
                | METADATA_OP_REFRESH_RATE
                | METADATA_OP_INTERLACED
                | METADATA_OP_S3D_FORMAT,
            buffer_geometry: BufferDim {
                width: 128,
                height: 96,
            },
            color_space: COLOR_SPACE_ITU_R_709,
            refresh_rate: 29.97,
            interlaced: 1,
            s3d_format: S3D_FORMAT_TOP_BOTTOM,
            ..Default::default()
        };

        layer.set_buffer(Some(&handle), -1).unwrap();

        let input_buffer = &layer.layer().input_buffer;
        assert_eq!(input_buffer.width, 128);
        assert_eq!(input_buffer.height, 96);
        assert_eq!(input_buffer.format, BufferFormat::YCbCr420SemiPlanarVenus);
        assert_eq!(input_buffer.csc, LayerCsc::LimitedRange709);
        assert!(input_buffer.flags.interlace);
        assert_eq!(input_buffer.s3d_format, S3dFormat::TopBottom);
        assert_eq!(layer.layer().frame_rate, 30);
    }

    #[test]
    fn surface_damage_changes_force_validation() {
        let mut layer = HwcLayer::new(0);
        assert!(!layer.needs_validate());

        // Same (empty) damage set: nothing to validate.
        layer.set_surface_damage(&[]);
        assert!(!layer.needs_validate());

        let rect = Rect {
            left: 0,
            top: 0,
            right: 10,
            bottom: 10,
        };
        layer.set_surface_damage(&[rect]);
        assert!(layer.needs_validate());

        layer.clear_needs_validate();
        layer.set_surface_damage(&[rect]);
        assert!(!layer.needs_validate());

        let moved = Rect {
            left: 5,
            ..rect
        };
        layer.set_surface_damage(&[moved]);
        assert!(layer.needs_validate());
    }

    #[test]
    fn visible_region_does_not_mark_geometry() {
        let mut layer = HwcLayer::new(0);
        layer.set_visible_region(&[Rect {
            left: 0,
            top: 0,
            right: 100,
            bottom: 100,
        }]);

        assert_eq!(layer.layer().visible_regions.len(), 1);
        assert!(layer.geometry_changes().is_empty());
    }

    #[test]
    fn first_release_fence_is_deferred() {
        let mut layer = HwcLayer::new(0);
        assert!(layer.pop_release_fence().is_none());

        let (read_end, _write_end) = pipe().unwrap();
        layer.push_release_fence(SyncFence::from_raw(read_end).unwrap());

        let fence = layer.pop_release_fence().unwrap();
        assert_eq!(fence.as_raw_descriptor(), read_end);
        assert!(layer.pop_release_fence().is_none());
    }

    #[test]
    fn blend_mode_from_raw_rejects_invalid() {
        assert!(BlendMode::try_from(2).is_ok());
        assert!(BlendMode::try_from(0).is_err());
        assert!(CompositionType::try_from(0).is_err());
        assert!(DisplayTransform::try_from(8).is_err());
    }
}
