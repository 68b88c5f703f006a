//! Domain Layer - Core value types for the pair engine
//!
//! Pure types with no I/O. All external interactions happen through the
//! ports layer.

pub mod instrument;
pub mod window;
pub mod beta;
pub mod signal;
pub mod order;
pub mod period;

pub use instrument::{parse_timestamp, BarEvent, InstrumentId, Leg};
pub use window::{PriceWindow, RollingWindow, SpreadSeries, WindowFill};
pub use beta::BetaVector;
pub use signal::{PositionState, Signal};
pub use order::{OrderIntent, OrderSide};
pub use period::{InvalidPeriod, ReplayPeriod};
