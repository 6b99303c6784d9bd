pub mod board;
pub mod counts;
pub mod db;
pub mod init;
pub mod issues;
pub mod labels;
pub mod projects;
pub mod teams;
pub mod users;
pub mod workflow;
