pub mod branch_opt_util;
pub mod entry;
pub mod error;
pub mod params;
pub mod prf;
