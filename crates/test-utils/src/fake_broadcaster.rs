#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use rigbuild::preview::ReloadBroadcaster;

/// Broadcaster that counts reloads instead of talking to browsers.
#[derive(Debug)]
pub struct RecordingBroadcaster {
    clients: usize,
    broadcasts: AtomicUsize,
}

impl RecordingBroadcaster {
    /// Pretend `clients` browsers are connected.
    pub fn new(clients: usize) -> Self {
        Self {
            clients,
            broadcasts: AtomicUsize::new(0),
        }
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

impl ReloadBroadcaster for RecordingBroadcaster {
    fn broadcast(&self) -> usize {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        self.clients
    }
}
