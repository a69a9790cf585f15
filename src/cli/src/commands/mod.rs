pub mod check;
pub mod demo;
pub mod list;
pub mod roles;
pub mod seed;
