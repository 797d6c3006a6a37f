//! Client core for the Beats jukebox.
//!
//! `BeatsCore` owns all mutable state and runs as a single task; front-ends
//! send it `Intent`s and watch the published `ViewState`.

pub mod api;
pub mod control;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod hold;
pub mod labels;
pub mod player;
pub mod poller;
pub mod session;
pub mod view;

pub use crate::core::{BeatsCore, CoreEvent, Intent};
pub use crate::error::{ApiError, ClientError};
pub use crate::hold::FieldKey;
pub use crate::player::FieldUpdate;
pub use crate::view::ViewState;
