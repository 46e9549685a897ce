//! CLI command implementations.
//!
//! | Module   | Commands handled                      |
//! |----------|---------------------------------------|
//! | `relay`  | `Relay`                               |
//! | `item`   | `Show`, `Edit`, `Status`, `Delete`    |
//! | `push`   | `Push`                                |
//! | `config` | `Config`                              |

pub mod config;
pub mod item;
pub mod push;
pub mod relay;

pub use config::cmd_config;
pub use item::{cmd_delete, cmd_edit, cmd_show, cmd_status};
pub use push::cmd_push;
pub use relay::cmd_relay;
