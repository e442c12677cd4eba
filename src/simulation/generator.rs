use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use crate::session::LiveSession;
use super::catalog::GIFT_CATALOG;

pub const TICK_PERIOD: Duration = Duration::from_millis(800);

pub const LIKE_THRESHOLD: f64 = 0.4;
pub const CHAT_THRESHOLD: f64 = 0.2;
pub const JOIN_THRESHOLD: f64 = 0.95;
pub const GIFT_THRESHOLD: f64 = 0.985;
pub const HEART_PROBABILITY: f64 = 0.3;
pub const FLUCTUATION_PROBABILITY: f64 = 0.5;
pub const MAX_LIKE_BURST: u64 = 5;
pub const MAX_FLUCTUATION: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeBurst {
    pub added: u64,
    pub heart: bool,
}

/// The gates that fired on one tick, with the picks each one made.
///
/// Like, chat, join and gift are all tested against the same draw, so they
/// overlap: chat implies like, gift implies join. Heart and fluctuation use
/// their own draws.
#[derive(Debug, Clone, PartialEq)]
pub struct TickPlan {
    pub draw: f64,
    pub like: Option<LikeBurst>,
    /// (user index, comment pool index)
    pub chat: Option<(usize, usize)>,
    /// user index
    pub join: Option<usize>,
    /// (user index, gift catalog index)
    pub gift: Option<(usize, usize)>,
    pub viewer_delta: Option<i64>,
}

impl TickPlan {
    pub fn roll<R: Rng + ?Sized>(rng: &mut R, users: usize, comments: usize) -> Self {
        let draw = rng.gen::<f64>();
        Self::from_draw(draw, rng, users, comments)
    }

    /// Evaluates the gates in order for a given shared draw. Remaining random
    /// picks come from `rng`. Both pools must be non-empty.
    pub fn from_draw<R: Rng + ?Sized>(draw: f64, rng: &mut R, users: usize, comments: usize) -> Self {
        debug_assert!(users > 0 && comments > 0, "generator started with an empty pool");

        let like = (draw < LIKE_THRESHOLD).then(|| LikeBurst {
            added: rng.gen_range(0..MAX_LIKE_BURST),
            heart: rng.gen::<f64>() < HEART_PROBABILITY,
        });

        let chat = (draw < CHAT_THRESHOLD).then(|| (rng.gen_range(0..users), rng.gen_range(0..comments)));

        let join = (draw > JOIN_THRESHOLD).then(|| rng.gen_range(0..users));

        let gift = (draw > GIFT_THRESHOLD).then(|| (rng.gen_range(0..users), rng.gen_range(0..GIFT_CATALOG.len())));

        let viewer_delta = (rng.gen::<f64>() < FLUCTUATION_PROBABILITY)
            .then(|| rng.gen_range(-MAX_FLUCTUATION..=MAX_FLUCTUATION));

        Self { draw, like, chat, join, gift, viewer_delta }
    }
}

/// Periodic audience simulation driving a [`LiveSession`].
pub struct EventGenerator {
    rng: StdRng,
    period: Duration,
}

impl Default for EventGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            period: TICK_PERIOD,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            period: TICK_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn plan_tick(&mut self, users: usize, comments: usize) -> TickPlan {
        TickPlan::roll(&mut self.rng, users, comments)
    }

    /// Ticks until cancelled. The first tick happens one period after start.
    pub(crate) async fn run(mut self, session: Arc<LiveSession>, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Event generator running every {:?}", self.period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(report) = session.run_tick(&mut self).await {
                        debug!("Tick r={:.3}: {:?}", report.draw, report);
                    }
                }
            }
        }
        info!("Event generator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICKS: usize = 10_000;
    // Chi-square critical value, one degree of freedom, p = 0.001.
    const CHI_SQUARE_CRITICAL: f64 = 10.828;

    fn chi_square(observed: usize, total: usize, p: f64) -> f64 {
        let expected_hit = total as f64 * p;
        let expected_miss = total as f64 * (1.0 - p);
        let hit = observed as f64;
        let miss = (total - observed) as f64;
        (hit - expected_hit).powi(2) / expected_hit + (miss - expected_miss).powi(2) / expected_miss
    }

    fn sample(seed: u64) -> Vec<TickPlan> {
        let mut generator = EventGenerator::seeded(seed);
        (0..TICKS).map(|_| generator.plan_tick(20, 16)).collect()
    }

    #[test]
    fn same_seed_same_outcomes() {
        assert_eq!(sample(42), sample(42));
        assert_ne!(sample(42), sample(43));
    }

    #[test]
    fn gate_rates_match_thresholds() {
        let plans = sample(2024);
        let count = |f: &dyn Fn(&TickPlan) -> bool| plans.iter().filter(|p| f(p)).count();

        let gates: [(&str, usize, f64); 5] = [
            ("like", count(&|p| p.like.is_some()), LIKE_THRESHOLD),
            ("chat", count(&|p| p.chat.is_some()), CHAT_THRESHOLD),
            ("join", count(&|p| p.join.is_some()), 1.0 - JOIN_THRESHOLD),
            ("gift", count(&|p| p.gift.is_some()), 1.0 - GIFT_THRESHOLD),
            ("fluctuation", count(&|p| p.viewer_delta.is_some()), FLUCTUATION_PROBABILITY),
        ];
        for (name, observed, p) in gates {
            let statistic = chi_square(observed, TICKS, p);
            assert!(
                statistic < CHI_SQUARE_CRITICAL,
                "{} gate fired {} times, chi-square {:.2}",
                name,
                observed,
                statistic
            );
        }

        let likes = count(&|p| p.like.is_some());
        let hearts = count(&|p| p.like.map_or(false, |l| l.heart));
        assert!(chi_square(hearts, likes, HEART_PROBABILITY) < CHI_SQUARE_CRITICAL);
    }

    #[test]
    fn shared_draw_makes_gates_nest() {
        for plan in sample(7) {
            if plan.chat.is_some() {
                assert!(plan.like.is_some());
            }
            if plan.gift.is_some() {
                assert!(plan.join.is_some());
            }
            assert!(!(plan.like.is_some() && plan.join.is_some()));
        }
    }

    #[test]
    fn picks_stay_in_range() {
        for plan in sample(99) {
            if let Some(burst) = plan.like {
                assert!(burst.added < MAX_LIKE_BURST);
            }
            if let Some((user, line)) = plan.chat {
                assert!(user < 20 && line < 16);
            }
            if let Some((_, gift)) = plan.gift {
                assert!(gift < GIFT_CATALOG.len());
            }
            if let Some(delta) = plan.viewer_delta {
                assert!((-MAX_FLUCTUATION..=MAX_FLUCTUATION).contains(&delta));
            }
        }
    }

    #[test]
    fn low_draw_fires_like_and_chat() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = TickPlan::from_draw(0.1, &mut rng, 5, 5);
        assert!(plan.like.is_some());
        assert!(plan.chat.is_some());
        assert!(plan.join.is_none());
        assert!(plan.gift.is_none());
    }

    #[test]
    fn high_draws_split_join_and_gift() {
        let mut rng = StdRng::seed_from_u64(1);
        let join_only = TickPlan::from_draw(0.97, &mut rng, 5, 5);
        assert!(join_only.join.is_some());
        assert!(join_only.gift.is_none());

        let both = TickPlan::from_draw(0.999, &mut rng, 5, 5);
        assert!(both.join.is_some());
        assert!(both.gift.is_some());
        assert!(both.like.is_none() && both.chat.is_none());

        let quiet = TickPlan::from_draw(0.5, &mut rng, 5, 5);
        assert!(quiet.like.is_none() && quiet.chat.is_none() && quiet.join.is_none() && quiet.gift.is_none());
    }
}
