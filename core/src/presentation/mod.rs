// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`api`] | Axum router for the learning and critic endpoints |

pub mod api;
