// Copyright 2026 Convoca Contributors
// SPDX-License-Identifier: Apache-2.0

//! Convoca library — incremental collection and normalization of SERVIR
//! job postings.
//!
//! This library crate exposes the pipeline modules for integration testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod normalize;
pub mod pipeline;
pub mod quality;
pub mod renderer;
pub mod stats;
pub mod store;
pub mod walker;
