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

//! Test harness for running the bridge relayer end to end.
//!
//! The relayer is wired with its real clients, pointed at small in-process
//! stand-ins for the source chain node, the proof verifier and the
//! destination node.

#![deny(unsafe_code)]

/// Fake nodes and relayer setup helpers.
pub mod utils;
