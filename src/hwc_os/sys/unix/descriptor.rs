// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs::File;
use std::os::raw::c_int;
use std::os::unix::io::AsRawFd;
use std::os::unix::io::FromRawFd;
use std::os::unix::io::IntoRawFd;
use std::os::unix::io::OwnedFd;
use std::os::unix::io::RawFd;

use nix::fcntl::fcntl;
use nix::fcntl::FcntlArg;

use crate::hwc_os::descriptor::AsRawDescriptor;
use crate::hwc_os::descriptor::FromRawDescriptor;
use crate::hwc_os::descriptor::IntoRawDescriptor;
use crate::hwc_os::descriptor::SafeDescriptor;

pub type RawDescriptor = c_int;

impl Drop for SafeDescriptor {
    fn drop(&mut self) {
        // Safe because we own the descriptor.
        let _ = unsafe { libc::close(self.descriptor) };
    }
}

impl AsRawFd for SafeDescriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.as_raw_descriptor()
    }
}

impl SafeDescriptor {
    /// Clones this descriptor, internally creating a new descriptor.  The new SafeDescriptor will
    /// share the same underlying count within the kernel.
    pub fn try_clone(&self) -> std::io::Result<SafeDescriptor> {
        let fd = fcntl(self.descriptor, FcntlArg::F_DUPFD_CLOEXEC(0))
            .map_err(|_| std::io::Error::last_os_error())?;
        // Safe because we just created this descriptor and nothing else has access to it.
        Ok(unsafe { SafeDescriptor::from_raw_descriptor(fd) })
    }
}

impl From<SafeDescriptor> for File {
    fn from(s: SafeDescriptor) -> File {
        // Safe because we own the SafeDescriptor at this point.
        unsafe { File::from_raw_fd(s.into_raw_descriptor()) }
    }
}

impl From<OwnedFd> for SafeDescriptor {
    fn from(fd: OwnedFd) -> SafeDescriptor {
        // Safe because we own the OwnedFd at this point.
        unsafe { SafeDescriptor::from_raw_descriptor(fd.into_raw_fd()) }
    }
}

impl AsRawDescriptor for File {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.as_raw_fd()
    }
}

impl AsRawDescriptor for OwnedFd {
    fn as_raw_descriptor(&self) -> RawDescriptor {
        self.as_raw_fd()
    }
}

impl IntoRawDescriptor for File {
    fn into_raw_descriptor(self) -> RawDescriptor {
        self.into_raw_fd()
    }
}

impl IntoRawDescriptor for OwnedFd {
    fn into_raw_descriptor(self) -> RawDescriptor {
        self.into_raw_fd()
    }
}
