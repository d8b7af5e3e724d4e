pub mod bootstrap;
pub mod migrate;
pub mod password;
