// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: classes, images, boxes and the store that owns them.

pub mod class;
pub mod image;
pub mod store;
