//! Terminal UI for picking a failure

mod picker;
pub mod theme;

pub use picker::{run_picker, Picker, PickerAction};
