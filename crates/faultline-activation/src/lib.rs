//! faultline-activation: live-system backends behind `ActivationPort`.
//! Pure IO boundary; every bisection decision is made in faultline-core.

pub mod command;
pub mod list_file;

pub use command::{CommandActivation, CommandRunner, CommandTemplates, ProcessRunner};
pub use list_file::ListFileActivation;
