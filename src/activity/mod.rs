pub mod ledger;

pub use ledger::{ActivityEntry, ActivityKind, ActivityLedger};
