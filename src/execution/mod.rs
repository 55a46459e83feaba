pub mod runtime;

pub use runtime::{handle_line, run_session, Flow};
