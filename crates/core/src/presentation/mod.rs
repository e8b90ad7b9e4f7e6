//! Consumer-side adapters that display or record finished frames.

pub mod image_directory_presenter;
pub mod log_presenter;
pub mod presenter;

pub use presenter::{Presenter, PresenterLoop};
