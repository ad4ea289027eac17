pub mod identity;
pub mod image;
pub mod init;
pub mod profile;
pub mod storage;
