pub mod role;
pub mod token;
pub mod user;

pub use role::PostgresRoleRepository;
pub use token::PostgresTokenLedger;
pub use user::PostgresUserRepository;
