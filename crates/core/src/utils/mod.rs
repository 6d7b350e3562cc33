pub mod time_utils;

pub use time_utils::{in_window, trailing_window_start, Clock, FixedClock, SystemClock};
