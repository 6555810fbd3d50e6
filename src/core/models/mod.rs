pub mod account;
pub mod user;

pub use account::{Account, AccountDraft, AccountPatch};
pub use user::{User, UserDraft, UserPatch};
