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

//! Retry logic for async calls

use std::time::Duration;

use backoff::backoff::Backoff;

/// A fixed delay applied after every failed relay tick.
///
/// It never gives up, a stuck remote dependency turns into bounded-rate
/// retries.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    /// Creates a new fixed delay policy.
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The delay between two attempts.
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Backoff for FixedDelay {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_never_gives_up() {
        let mut b = FixedDelay::new(Duration::from_secs(5));
        for _ in 0..100 {
            assert_eq!(b.next_backoff(), Some(Duration::from_secs(5)));
        }
    }
}
