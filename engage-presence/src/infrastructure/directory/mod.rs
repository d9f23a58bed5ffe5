//! 账号目录适配器

mod account_directory;

pub use account_directory::InMemoryAccountDirectory;
