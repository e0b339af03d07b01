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

/// The default port the control API will listen on. Defaults to 3001.
pub const fn port() -> u16 {
    3001
}
/// Six blocks on top are enough by default.
pub const fn min_confirmations() -> u64 {
    6
}
/// The request timeout of node clients is set to `30_000` ms by default.
pub const fn request_timeout() -> u64 {
    30_000
}
/// The verifier gets `10_000` ms by default.
pub const fn verifier_timeout() -> u64 {
    10_000
}
/// The polling interval is set to `15_000` ms by default.
pub const fn polling_interval() -> u64 {
    15_000
}
/// The retry delay is set to `5_000` ms by default.
pub const fn retry_delay() -> u64 {
    5_000
}

/// The default bridge program on the destination.
pub fn bridge_program_id() -> String {
    String::from("bridge")
}
