//! External service integrations.

pub mod crm_client {
    pub use crate::crm_client::*;
}
