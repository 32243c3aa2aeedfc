// SPDX-FileCopyrightText: 2026 Libris Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions. Each takes `&Database` and runs one closure on the
//! connection thread.

pub mod directory;
pub mod events;
pub mod feed;
pub mod status;

mod row;
