//! # Circlock
//!
//! A circular clock engine: cascading time rings plus polled alarms.
//!
//! Circlock keeps "the time the clock shows" in a set of rings (hours,
//! minutes, seconds, weekday) that only move when told to. A background
//! ticker advances them one second at a time, and a second loop matches each
//! published tick against stored alarms. The clock is independent of the system clock
//! until explicitly synchronized with a `TimeSource`.
//!
//! ## Core Concepts
//!
//! - **RingSequence**: A fixed cyclic sequence with a cursor. Advancing past
//!   the last value wraps to the first.
//! - **Cascade**: Seconds wrapping to 0 advance the minute; minutes wrapping
//!   advance the hour; the 24h hour wrapping advances the weekday.
//! - **Canonical hour**: Alarms are matched on the 0..23 hour regardless of
//!   whether the clock displays 12h or 24h.
//! - **Event-Driven**: Every tick publishes a `TimeSnapshot`; lifecycle and
//!   alarm activity are broadcast as `SystemEvent` and `AlarmEvent`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use circlock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create the engine with the default configuration (Colombia time).
//!     let engine = ClockEngine::new(ClockConfig::default());
//!
//!     // 2. Subscribe to the tick stream before starting the engine.
//!     let mut ticks = engine.subscribe_ticks();
//!     tokio::spawn(async move {
//!         while let Ok(snapshot) = ticks.recv().await {
//!             println!("{:02}:{:02}:{:02} {}", snapshot.hour, snapshot.minute,
//!                 snapshot.second, snapshot.period_marker());
//!         }
//!     });
//!
//!     // 3. Register an alarm.
//!     engine
//!         .create_alarm(NewAlarm::new(6, 30, Period::AM).titled("Wake up"))
//!         .await?;
//!
//!     // 4. Run the clock and the alarm checker. Shuts down on Ctrl+C.
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Circlock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod alarm;
pub mod clock;
pub mod common;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod registry;
pub mod ring;
pub mod rings;
pub mod time;
mod worker;

/// A prelude module for easy importing of the most common Circlock types.
pub mod prelude {
    pub use crate::alarm::{parse_alarm_date, Alarm, AlarmLog, LogStatus, NewAlarm, SnoozePolicy};
    pub use crate::common::{AlarmId, ObserverId};
    pub use crate::config::ClockConfig;
    pub use crate::engine::{ClockEngine, ClockStats};
    pub use crate::error::ClockError;
    pub use crate::events::{
        AlarmEvent, HandAngles, HourFormat, Period, SystemEvent, TimeSnapshot,
    };
    pub use crate::time::{FixedTimeSource, TimeSource, WallTime, ZonedTimeSource};
}
