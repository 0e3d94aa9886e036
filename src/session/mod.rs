pub mod store;

pub use store::{ResolvedSession, Session, SessionPatch, SessionStore};
