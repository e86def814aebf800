//! Per-room event fan-out
//!
//! Each live room owns a `tokio::sync::broadcast` channel. Connections that
//! joined a room hold a receiver; services publish after every mutation.
//! Channels are created lazily and dropped once the room is closed or its
//! last subscriber leaves.

use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

use super::events::ServerEvent;

pub struct RoomBroadcaster {
    channels: Mutex<HashMap<String, broadcast::Sender<ServerEvent>>>,
    capacity: usize,
}

impl RoomBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to every event published to `room_id` from now on
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<ServerEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop a receiver and forget the room's channel once nobody is left
    pub fn unsubscribe(&self, room_id: &str, rx: broadcast::Receiver<ServerEvent>) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        drop(rx);

        if channels.get(room_id).is_some_and(|tx| tx.receiver_count() == 0) {
            channels.remove(room_id);
        }
    }

    /// Send an event to everyone in the room. Returns the number of receivers.
    pub fn publish(&self, room_id: &str, event: ServerEvent) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());

        let Some(tx) = channels.get(room_id) else {
            return 0;
        };

        match tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                // Nobody is listening any more
                channels.remove(room_id);
                0
            }
        }
    }

    /// Publish a final event and drop the room's channel. Subscribers drain
    /// what is queued and then observe the channel as closed.
    pub fn close_room(&self, room_id: &str, final_event: ServerEvent) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        match channels.remove(room_id) {
            Some(tx) => tx.send(final_event).unwrap_or(0),
            None => 0,
        }
    }

    pub fn subscriber_count(&self, room_id: &str) -> usize {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.get(room_id).map(|tx| tx.receiver_count()).unwrap_or(0)
    }

    pub fn active_rooms(&self) -> usize {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
