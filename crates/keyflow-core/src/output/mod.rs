// Keyflow Output Layer
// Virtual device creation and event replay

mod uinput;

pub use uinput::{UInputError, VirtualOutput};
