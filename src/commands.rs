pub mod check;
pub mod clean;
pub mod generate;
pub mod init;
pub mod serve;
