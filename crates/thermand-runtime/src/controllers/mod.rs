//! Built-in controllers.
//!
//! Controllers read sensors from `"actual"` and drive actuator values.
//! The two here cover the ends of the complexity spectrum - a fixed
//! setting and a classic PID loop - and double as reference
//! implementations for out-of-tree controllers: both obey the
//! permission rule (value-replace existing actuators, never mint or
//! drop devices) and the stateful one shows the config/runtime split.

mod fixed;
mod pid;

pub use fixed::FixedSpeedController;
pub use pid::{PidController, PidTerms};
