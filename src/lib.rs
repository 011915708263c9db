mod error;
pub use error::Error;

mod config;
pub use config::WhisperConfig;

mod types;
pub use types::UserId;

mod crypto;
pub use crypto::*;

mod key_store;
pub use key_store::KeyStore;

mod ledger;
pub use ledger::Ledger;

mod state;
pub use state::*;

mod host;
pub use host::*;

mod memory;
pub use memory::*;

mod router;
pub use router::*;

mod intercept;
pub use intercept::*;

mod log_filter;
pub use log_filter::*;

mod gate;
pub use gate::*;

mod commands;
pub use commands::WhisperCommand;

mod plugin;
pub use plugin::WhisperChain;
