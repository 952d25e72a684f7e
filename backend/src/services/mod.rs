pub mod media;
pub mod signer;

pub use media::{MediaAuthorizer, VideoTicket};
pub use signer::{SignedUrlIssuer, StreamFormat, TokenAuthSigner};
