pub(crate) mod annotate;
pub(crate) mod blend;
pub(crate) mod blur;
pub(crate) mod cell;
pub(crate) mod grid;
pub(crate) mod overlay;
pub(crate) mod surface;
