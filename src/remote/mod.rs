// src/remote/mod.rs  —  Raw IR reports → debounced logical events
pub mod buttons;
pub mod report;
pub mod special;
pub mod timing;

pub use buttons::{ButtonMachine, LogicalButton};
pub use report::{decode, Category, DecodedCommand, RawReport, REPORT_LEN};
pub use special::{SpecialEvent, SpecialMachine};
