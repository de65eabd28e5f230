pub mod filter_bank;
pub mod state_variable_tpt;

pub use self::filter_bank::{FilterBank, FilterSettings};
pub use self::state_variable_tpt::{FilterMode, StateVariableFilterTpt};
