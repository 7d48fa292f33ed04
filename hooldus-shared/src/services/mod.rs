pub mod cloudwatch_services;
pub mod credential_minter;
pub mod dispatch_orchestrator;
pub mod message_dispatcher;
pub mod secrets_services;
pub mod target_resolver;
pub mod token_lifecycle;
