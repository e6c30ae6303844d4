pub(crate) mod json_file;
pub(crate) mod memory;
pub(crate) mod object;
