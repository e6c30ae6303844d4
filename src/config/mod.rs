pub(crate) mod color;
pub(crate) mod mask;
pub(crate) mod model;
pub(crate) mod ratio;
