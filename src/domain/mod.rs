pub mod entities;
pub mod sync;
pub mod validation;
pub mod value_objects;
