pub mod flag_table;
pub mod option_set;

pub use flag_table::{FlagSpec, ValueKind, FLAG_TABLE};
pub use option_set::{parse_assignment, Mode, OptionSet, OptionValue};
