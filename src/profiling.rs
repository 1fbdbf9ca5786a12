// Copyright 2024 Saptak Santra
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

//! Tracing bootstrap for the `profiling` feature.
//!
//! The hot paths (`spawn`, `spawn_batch`, `apply_despawns`, command replay)
//! open `info_span!` scopes when this feature is enabled. Call [`init`] once
//! at startup to print them, filtered through `RUST_LOG`:
//!
//! ```ignore
//! mask_ecs::profiling::init();
//! ```
//!
//! Profile in release mode for representative timings.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Install a global fmt subscriber honoring `RUST_LOG`.
///
/// Later calls are no-ops once a global subscriber is set.
pub fn init() {
    let _ = Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
