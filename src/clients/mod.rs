// Exchange gateway contract and implementations

pub mod gateway;
pub mod memory;
pub mod rest;

// Re-export client types
pub use gateway::ExchangeGateway;
pub use memory::InMemoryExchange;
pub use rest::RestGateway;
