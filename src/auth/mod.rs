mod claims;
mod extract;
mod jwt;

pub use claims::Claims;
pub use extract::AuthUser;
pub use jwt::JwtKeys;
