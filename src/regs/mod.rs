mod ieee488;

pub use ieee488::{EventStatus, QUERY_ESR, CLEAR_STATUS};
