pub(crate) mod clip;
pub(crate) mod line;
pub(crate) mod resample;
