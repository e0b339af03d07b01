// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Bridge Relayer Crate 🕸️
//!
//! A crate for relaying private bridge transfers from a shielded source chain
//! to a destination node.
//!
//! ## Overview
//!
//! The relayer watches the source chain for transactions that carry a bridge
//! marker in an `OP_RETURN` output. Once such a transaction is buried under
//! enough confirmations, its proof is checked with the configured verifier and
//! the decoded transfer is submitted to the destination node. Every nullifier
//! is relayed at most once, and progress survives restarts through a
//! checkpoint file.
//!
//! The relayer is driven through a small HTTP control API, see
//! [`service::build_web_services`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// A module for starting the relayer and its HTTP server.
pub mod service;

pub use bridge_relayer_utils::{Error, Result};
