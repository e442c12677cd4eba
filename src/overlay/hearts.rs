use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::task::JoinHandle;
use crate::overlay::events::{OverlayEvent, OverlayEvents};

pub const HEART_LIFETIME: Duration = Duration::from_millis(2000);
pub const HEART_PALETTE: [&str; 5] = ["#FF4D4D", "#FF85B3", "#FF0055", "#FF3366", "#FFFFFF"];
pub const HEART_JITTER: f32 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingHeart {
    pub id: u64,
    pub color: &'static str,
    pub x_offset: f32,
}

struct Pool {
    next_id: u64,
    live: Vec<FloatingHeart>,
    expiries: HashMap<u64, JoinHandle<()>>,
    rng: SmallRng,
    closed: bool,
}

impl Pool {
    fn remove(&mut self, id: u64) -> bool {
        self.expiries.remove(&id);
        let before = self.live.len();
        self.live.retain(|h| h.id != id);
        self.live.len() != before
    }
}

/// Hearts spawned by like trigger edges. Each heart expires on its own timer.
#[derive(Clone)]
pub struct HeartPool {
    pool: Arc<Mutex<Pool>>,
    events: OverlayEvents,
    lifetime: Duration,
}

impl HeartPool {
    pub fn new(events: OverlayEvents) -> Self {
        Self::with_rng(events, SmallRng::from_entropy())
    }

    pub fn with_rng(events: OverlayEvents, rng: SmallRng) -> Self {
        Self {
            pool: Arc::new(Mutex::new(Pool {
                next_id: 0,
                live: Vec::new(),
                expiries: HashMap::new(),
                rng,
                closed: false,
            })),
            events,
            lifetime: HEART_LIFETIME,
        }
    }

    /// Called once per observed value of the like trigger counter. The
    /// counter's initial zero never spawns a heart, and nothing spawns after
    /// [`HeartPool::shutdown`].
    pub fn on_trigger(&self, trigger: u64) -> Option<FloatingHeart> {
        if trigger == 0 {
            return None;
        }

        let mut pool = self.pool.lock();
        if pool.closed {
            return None;
        }
        let id = pool.next_id;
        pool.next_id += 1;
        let heart = FloatingHeart {
            id,
            color: HEART_PALETTE[pool.rng.gen_range(0..HEART_PALETTE.len())],
            x_offset: pool.rng.gen_range(-HEART_JITTER..HEART_JITTER),
        };
        pool.live.push(heart.clone());

        let shared = Arc::clone(&self.pool);
        let events = self.events.clone();
        let lifetime = self.lifetime;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            let removed = shared.lock().remove(id);
            if removed {
                events.emit(OverlayEvent::HeartExpired(id));
            }
        });
        pool.expiries.insert(id, expiry);
        drop(pool);

        self.events.emit(OverlayEvent::HeartSpawned(heart.clone()));
        Some(heart)
    }

    /// Removes a heart early. Unknown ids are ignored.
    pub fn remove(&self, id: u64) -> bool {
        let mut pool = self.pool.lock();
        if let Some(expiry) = pool.expiries.get(&id) {
            expiry.abort();
        }
        pool.remove(id)
    }

    pub fn live(&self) -> Vec<FloatingHeart> {
        self.pool.lock().live.clone()
    }

    pub fn len(&self) -> usize {
        self.pool.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every expiry timer, drops all live hearts and refuses new ones.
    pub fn shutdown(&self) {
        let mut pool = self.pool.lock();
        pool.closed = true;
        for (_, expiry) in pool.expiries.drain() {
            expiry.abort();
        }
        pool.live.clear();
    }
}
