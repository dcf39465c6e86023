pub mod server;
pub mod signature;

pub use server::{SIGNATURE_HEADER, WebhookConfig, WebhookState, router, serve};
pub use signature::{AuthError, sign, verify};
