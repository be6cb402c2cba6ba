pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_CLIENT: &str = "CLIENT";

pub const KNOWN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_CLIENT];
