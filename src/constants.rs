pub mod recipe {

    /// Lower bound for ingredient amounts and cooking time.
    pub const MIN_AMOUNT: i32 = 1;

    /// Upper bound for ingredient amounts and cooking time.
    pub const MAX_AMOUNT: i32 = 32000;

    pub const MAX_NAME_LENGTH: usize = 200;
}

pub mod users {

    pub const MAX_NAME_LENGTH: usize = 150;

    pub const MAX_EMAIL_LENGTH: usize = 254;
}

pub mod pagination {

    pub const DEFAULT_PAGE_SIZE: u64 = 6;

    pub const MAX_PAGE_SIZE: u64 = 100;
}

pub mod roles {

    pub const USER: &str = "user";

    pub const ADMIN: &str = "admin";
}
