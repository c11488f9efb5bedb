// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! This module translates host display-API layer state into the display manager's
//! internal layer representation: pixel formats, color metadata, geometry and the
//! release-fence lifecycle.

mod buffer;
mod fence;
mod formats;
mod layer;
mod metadata;

pub use buffer::*;
pub use fence::ReleaseFenceQueue;
pub use fence::SyncFence;
pub use formats::*;
pub use layer::*;
pub use metadata::*;
