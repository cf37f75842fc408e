mod fee_rate;
mod pool;
mod recently_evicted;

pub use fee_rate::FeeRate;
pub use pool::{MemPool, MemPoolConfig, MempoolAcceptError, PendingEffects};
pub use recently_evicted::RecentlyEvictedCache;
