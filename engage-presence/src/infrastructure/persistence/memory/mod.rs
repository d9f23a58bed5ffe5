//! 内存存储实现（单进程部署与测试）

mod chat_repository;
mod connection_repository;
mod presence_cache;
mod visitor_repository;

pub use chat_repository::InMemoryChatRepository;
pub use connection_repository::InMemoryConnectionRepository;
pub use presence_cache::InMemoryPresenceCache;
pub use visitor_repository::InMemoryVisitorRepository;
