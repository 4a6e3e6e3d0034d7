pub(crate) mod blend;
pub(crate) mod emit;
pub(crate) mod eval;
pub(crate) mod model;
