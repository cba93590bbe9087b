pub(crate) mod console;
pub mod junit;
