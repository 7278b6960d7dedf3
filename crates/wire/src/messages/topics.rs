//! Topic constants. Topics follow `fanout.<component>.<direction>`.

/// Requests handled by the Space service.
pub const SPACE_REQUEST: &str = "fanout.space.request";

pub const SPACE_REPLY: &str = "fanout.space.reply";

/// Requests handled by a worker's own service.
pub const COMPUTER_REQUEST: &str = "fanout.computer.request";

pub const COMPUTER_REPLY: &str = "fanout.computer.reply";
