pub(crate) mod address;
pub(crate) mod contact;
pub(crate) mod dates;
pub(crate) mod identifiers;
pub(crate) mod names;
