pub mod middleware;
pub mod policy;
pub mod sliding_window;
pub mod sweeper;

pub use middleware::{rate_limit_middleware, RouteRateLimit};
pub use policy::Policy;
pub use sliding_window::{RateLimitResult, SlidingWindowRateLimiter};
pub use sweeper::{Sweeper, SweeperHandle};
