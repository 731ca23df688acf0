//! IEEE 488.2 common status registers.

use bitflags::bitflags;

/// Standard Event Status Register query.
pub const QUERY_ESR: &str = "*ESR?";

/// Clear Status command; clears the event registers and the error queue.
pub const CLEAR_STATUS: &str = "*CLS";

bitflags! {
    /// Standard Event Status Register. Reading it (`*ESR?`) clears it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventStatus: u8 {
        /// All pending operations completed following `*OPC`.
        const OperationComplete = 1<<0;
        const RequestControl    = 1<<1;
        /// A response was requested while none was available, or the output queue overflowed.
        const QueryError        = 1<<2;
        const DeviceError       = 1<<3;
        /// A command was parsed but could not be executed, e.g. a parameter out of range.
        const ExecutionError    = 1<<4;
        /// A command could not be parsed.
        const CommandError      = 1<<5;
        const UserRequest       = 1<<6;
        const PowerOn           = 1<<7;
    }
}

impl EventStatus {
    pub const ERRORS: EventStatus = EventStatus::QueryError
        .union(EventStatus::DeviceError)
        .union(EventStatus::ExecutionError)
        .union(EventStatus::CommandError);

    pub fn errors(self) -> EventStatus {
        self.intersection(Self::ERRORS)
    }

    pub fn has_errors(self) -> bool {
        self.intersects(Self::ERRORS)
    }
}
