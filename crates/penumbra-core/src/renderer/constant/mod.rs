// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! GPU-resident constant data.
//!
//! One uniform buffer holds every constant block of a frame. The
//! [`ConstantRegionAllocator`] hands out aligned byte ranges of it during a
//! mapped session, and [`layout`] defines the std140 blocks written into them.

mod allocator;
pub mod layout;

pub use self::allocator::{AlignmentPolicy, BlockWriter, ConstantRegion, ConstantRegionAllocator};
