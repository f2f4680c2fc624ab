//! Progress checkpoints published at stage boundaries

pub const GENERATE_PERCENT: u8 = 0;
pub const COMPILE_PERCENT: u8 = 30;
pub const VERIFY_PERCENT: u8 = 60;
pub const COMPLETE_PERCENT: u8 = 100;
