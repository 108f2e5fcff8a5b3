pub mod actions;
pub mod config;
pub mod error;
pub mod persistence;
pub mod progression;
pub mod reducer;
pub mod roster;
pub mod state;
pub mod timer;
pub mod view;

pub use actions::*;
pub use config::Config;
pub use error::FlowError;
pub use error::FlowResult;
pub use reducer::*;
pub use state::*;

pub use persistence::*;
