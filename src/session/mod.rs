pub mod csrf;
pub mod flash;
pub mod store;
pub mod visitor;
