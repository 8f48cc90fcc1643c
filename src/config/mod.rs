pub mod features;
pub mod runtime;
pub mod profiles;
pub mod loader;

pub use features::*;
pub use runtime::*;
pub use profiles::*;
pub use loader::{load_config, to_toml};
