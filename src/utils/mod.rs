pub mod crypto;
pub mod logging;
pub mod time;
pub mod validation;
