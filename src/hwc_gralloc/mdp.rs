// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! mdp: The display-controller seam used to toggle hardware protection on overlay
//! buffers.

#![allow(non_camel_case_types)]

use std::fs::File;
use std::fs::OpenOptions;
use std::os::raw::c_int;
use std::os::unix::io::AsRawFd;

use nix::ioctl_write_ptr;

use crate::hwc_os::AsRawDescriptor;
use crate::hwc_utils::HwcError;
use crate::hwc_utils::HwcResult;

/// Secure-buffer configuration payload, fixed by the display-controller uapi.
#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct msmfb_secure_config {
    pub fd: c_int,
    pub enable: c_int,
}

const MSMFB_IOCTL_MAGIC: u8 = b'm';
const MSMFB_BUFFER_SECURE: u8 = 170;

ioctl_write_ptr!(
    msmfb_buffer_secure,
    MSMFB_IOCTL_MAGIC,
    MSMFB_BUFFER_SECURE,
    msmfb_secure_config
);

/// Trait implemented by anything that can place a buffer under hardware protection.
/// Toggling must be all-or-nothing: on failure the buffer stays in its previous state.
pub trait SecureBufferControl: Send {
    fn set_secure(&mut self, descriptor: &dyn AsRawDescriptor, enable: bool) -> HwcResult<()>;
}

/// The default control seam: the primary display's control node.
pub struct MdpControl {
    device: File,
}

impl MdpControl {
    /// Opens the display control node.  Android targets expose it under /dev/graphics,
    /// mainline kernels under /dev.
    pub fn open() -> HwcResult<MdpControl> {
        const CONTROL_PATHS: [&str; 2] = ["/dev/graphics/fb0", "/dev/fb0"];

        for path in CONTROL_PATHS {
            if let Ok(device) = OpenOptions::new().read(true).write(true).open(path) {
                return Ok(MdpControl { device });
            }
        }

        Err(HwcError::SpecViolation("no display control node opened"))
    }
}

impl SecureBufferControl for MdpControl {
    fn set_secure(&mut self, descriptor: &dyn AsRawDescriptor, enable: bool) -> HwcResult<()> {
        let config = msmfb_secure_config {
            fd: descriptor.as_raw_descriptor(),
            enable: enable as c_int,
        };

        // Safe because the config payload outlives the ioctl and the kernel does not
        // retain it.
        unsafe {
            msmfb_buffer_secure(self.device.as_raw_fd(), &config)
                .map_err(|e| HwcError::SecureToggleFailed(e as i32))?;
        }

        Ok(())
    }
}
