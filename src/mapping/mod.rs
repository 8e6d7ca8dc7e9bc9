// Mapping module - turns flat cursor rows into typed values and groups
//
// - key_value: per-row carrier between a mapper and the grouping engine
// - one_to_many: parent key -> ordered children accumulation
// - cursor: forward-only typed row access and the map/normalize operations

pub mod cursor;
pub mod key_value;
pub mod one_to_many;

pub use cursor::Cursor;
pub use key_value::KeyValue;
pub use one_to_many::{Group, OneToMany};
