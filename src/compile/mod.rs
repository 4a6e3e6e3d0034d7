pub(crate) mod compiler;
pub(crate) mod lookup;
pub(crate) mod patch;
pub(crate) mod signature;
