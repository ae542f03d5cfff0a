pub mod actions;
pub mod bus;
pub mod protocol;
