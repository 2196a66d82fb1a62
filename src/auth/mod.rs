//! Authentication module
//!
//! Session state, the persisted fallback flag and the auth flows.
//! Credentials themselves live on the platform; the client only keeps
//! the current user and the fallback cookie.

mod fallback;
mod flows;
mod session;

pub use fallback::{SIGNED_OUT, SessionFallback};
pub use flows::{Destination, bootstrap, sign_in, sign_out, sign_up};
pub use session::{SessionState, SessionStore};
