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

//! Error types

use std::fmt;

/// ECS error type
///
/// Entity-path operations signal failure through `bool`/`Option` returns;
/// this enum only covers registration against compile-time caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// All component bits are taken
    ComponentLimitReached,

    /// All tag slots are taken
    TagLimitReached,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::ComponentLimitReached => {
                write!(f, "component limit reached (max {})", crate::MAX_COMPONENTS)
            }
            EcsError::TagLimitReached => {
                write!(f, "tag limit reached (max {})", crate::MAX_TAGS)
            }
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
