pub mod argon2;
pub mod errors;
pub mod strength;

pub use argon2::HashedPassword;
pub use argon2::PasswordHasher;
pub use errors::PasswordError;
pub use strength::is_password_strong;
