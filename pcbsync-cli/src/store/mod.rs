//! Repository layer for database operations

mod pcb;

pub use pcb::PcbStore;
