#![doc = include_str!("../README.md")]

pub mod client;
pub mod error;
pub mod metadata;
#[cfg(feature = "axum")]
pub mod middleware;
pub mod secrets;

// Re-exports for convenient access
pub use client::{
    AuthorizationRequest, Audience, ClientAuthMethod, IntrospectionResult, OidcClient, TokenSet,
    UserProfile, generate_state,
};
pub use error::Error;
pub use metadata::ProviderMetadata;
pub use secrets::ClientSecrets;
