//! Identity core: password records, session lifecycle and the authorization gate.
//! Keep the public surface thin and split implementation across sub-modules.

mod clock;
mod gate;
mod model;
mod password;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{require_role, AuthorizationGate, SessionCookie};
pub use model::{Credentials, NewUser, PasswordRecord, Role, Session, SessionContext, User, UserId, UserRecord};
pub use password::{HashParams, PasswordHasher, SALT_LEN};
pub use session::{SessionManager, DEFAULT_SESSION_TTL_SECS};
