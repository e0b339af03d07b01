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

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Listens for the stop signal of a relayer.
///
/// Stop is signalled using a `broadcast::Receiver`. Only a single value is
/// ever sent. Dropping every sender counts as a stop signal too, so a relayer
/// whose handle is gone winds down on its own.
///
/// The `Shutdown` struct listens for the signal and tracks that the signal has
/// been received. Callers may query for whether the shutdown signal has been
/// received or not.
#[derive(Debug)]
pub struct Shutdown {
    /// `true` if the shutdown signal has been received
    shutdown: bool,

    /// The receive half of the channel used to listen for shutdown.
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Create a new `Shutdown` backed by the given `broadcast::Receiver`.
    pub fn new(notify: broadcast::Receiver<()>) -> Shutdown {
        Shutdown {
            shutdown: false,
            notify,
        }
    }

    /// Returns `true` if the shutdown signal has been received, without
    /// waiting.
    pub fn is_shutdown(&mut self) -> bool {
        if !self.shutdown {
            self.shutdown = !matches!(
                self.notify.try_recv(),
                Err(TryRecvError::Empty)
            );
        }
        self.shutdown
    }

    /// Receive the shutdown notice, waiting if necessary.
    pub async fn recv(&mut self) {
        // If the shutdown signal has already been received, then return
        // immediately.
        if self.shutdown {
            return;
        }

        // Cannot receive a "lag error" as only one value is ever sent.
        let _ = self.notify.recv().await;

        // Remember that the signal has been received.
        self.shutdown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn observes_signal_without_waiting() {
        let (tx, rx) = broadcast::channel(2);
        let mut shutdown = Shutdown::new(rx);
        assert!(!shutdown.is_shutdown());
        tx.send(()).unwrap();
        assert!(shutdown.is_shutdown());
        // sticky
        assert!(shutdown.is_shutdown());
        shutdown.recv().await;
    }

    #[tokio::test]
    async fn dropped_sender_means_shutdown() {
        let (tx, rx) = broadcast::channel::<()>(2);
        let mut shutdown = Shutdown::new(rx);
        drop(tx);
        assert!(shutdown.is_shutdown());
    }
}
