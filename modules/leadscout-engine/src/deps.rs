use std::sync::Arc;

use chrono::{DateTime, Utc};

use leadscout_common::Config;
use leadscout_realtime::Realtime;
use leadscout_store::DocStore;

use crate::budget::BudgetTracker;
use crate::providers::ProviderSet;

/// Process-lifetime clock. Injectable so tests pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Randomness source. Only used for jitter and stagger - injectable so tests
/// are deterministic.
pub trait Rand: Send + Sync {
    /// Uniform value in `[0, max)`. `max` of 0 returns 0.
    fn below(&self, max: u64) -> u64;
}

pub struct ThreadRand;

impl Rand for ThreadRand {
    fn below(&self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        rand::Rng::random_range(&mut rand::rng(), 0..max)
    }
}

/// Zero jitter for tests.
pub struct NoRand;

impl Rand for NoRand {
    fn below(&self, _max: u64) -> u64 {
        0
    }
}

/// Everything the engines need, constructed once at startup and threaded
/// through - no process-wide singletons.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocStore>,
    pub providers: Arc<ProviderSet>,
    pub realtime: Arc<Realtime>,
    pub clock: Arc<dyn Clock>,
    pub rand: Arc<dyn Rand>,
    pub budget: Arc<BudgetTracker>,
    /// Free-tier batch mode: cap fan-out and stagger provider starts.
    pub batch_mode: bool,
}

impl Services {
    pub fn new(store: Arc<dyn DocStore>, providers: Arc<ProviderSet>, config: &Config) -> Self {
        Self {
            store: store.clone(),
            providers,
            realtime: Arc::new(Realtime::new(store)),
            clock: Arc::new(SystemClock),
            rand: Arc::new(ThreadRand),
            budget: Arc::new(BudgetTracker::new(config.daily_budget_cents)),
            batch_mode: config.batch_mode,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rand(mut self, rand: Arc<dyn Rand>) -> Self {
        self.rand = rand;
        self
    }

    pub fn user_store(&self, user_id: &str) -> leadscout_store::UserStore {
        leadscout_store::UserStore::new(self.store.clone(), user_id)
    }
}
