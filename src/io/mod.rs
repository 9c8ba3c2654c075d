// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O boundaries: media import, class transfer, export and inference.

pub mod export;
pub mod inference;
pub mod media;
pub mod transfer;
