//! # credstrap core
//!
//! Bootstraps authenticated HTTP clients for an OAuth-protected API family.
//!
//! This crate provides:
//! - Token records, a JSON codec and a file store with optional encryption at rest
//! - The interactive delegated flow and the signed-assertion service-identity flow
//! - Transport handles: HTTP clients bound to one credential, refreshed on demand
//! - A client registry and the (context, option) pair API-service constructors take
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use credstrap_core::{factory, initiator, ScopeSet};
//!
//! async fn drive_client() -> Result<(), Box<dyn std::error::Error>> {
//!     let client_secret = std::fs::read("client_secret.json")?;
//!     let scopes: ScopeSet = ["https://www.googleapis.com/auth/drive"].into_iter().collect();
//!
//!     let handle = factory::from_stored_token(&client_secret, "token.json", &scopes)?;
//!     let (ctx, option) = initiator::context_for_handle(&handle);
//!     // DriveService::new(ctx, option)
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod factory;
pub mod initiator;
pub mod model;
pub mod oauth;
pub mod scope;
pub mod store;
pub mod token;
pub mod transport;
pub mod userinfo;

// Re-export commonly used types at crate root
pub use model::{
    ClientSecretDefinition,
    CredentialKind,
    ServiceAccountKey,
};

pub use store::{
    Secret,
    StoreError,
    TokenStore,
};

pub use codec::CodecError;

pub use token::Token;

pub use scope::ScopeSet;

pub use oauth::{
    AuthError,
    assertion::AssertionAuthorizer,
    interactive::{AuthorizerState, CodePrompt, ConsolePrompt, InteractiveAuthorizer},
};

pub use transport::{
    TokenSource,
    TransportHandle,
};

pub use initiator::{
    CallContext,
    ClientOption,
    ClientRegistry,
    InitiatorError,
    ServiceInit,
    context_for_handle,
};

pub use config::ApiConfig;

pub use userinfo::UserInfo;

pub use error::CredstrapError;
