pub mod guard;
pub mod store;
