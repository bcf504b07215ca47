pub(crate) mod detect;
pub(crate) mod dib;
pub(crate) mod jpeg;
pub(crate) mod loader;
pub(crate) mod png;
