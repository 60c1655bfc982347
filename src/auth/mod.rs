//! HTTP authentication schemes.

mod digest;

pub use digest::Algorithm;
pub use digest::AuthInfo;
pub use digest::DigestAuthChallengeScheme;
pub use digest::DigestAuthRequestScheme;
pub use digest::Qop;
