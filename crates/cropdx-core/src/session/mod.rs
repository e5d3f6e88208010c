//! Session domain module.
//!
//! One `Session` is one capture-to-diagnosis attempt, re-entered for every new
//! image. All mutation goes through its transition methods.
//!
//! # Module Structure
//!
//! - `phase`: workflow phases (`Phase`) and upload tickets (`UploadTicket`)
//! - `model`: the state machine itself (`Session`)
//! - `snapshot`: read-only serializable view for the presentation layer

mod model;
mod phase;
mod snapshot;

pub use model::Session;
pub use phase::{Phase, UploadTicket};
pub use snapshot::{LabelAdvice, SessionSnapshot};
