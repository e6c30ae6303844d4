pub(crate) mod acquire;
pub(crate) mod decode;
pub(crate) mod source;
pub(crate) mod text;
