pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Recipe previews shown per author in subscription listings
pub const DEFAULT_RECIPES_LIMIT: i64 = 3;

pub const USERNAME_MAX_LENGTH: usize = 30;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PERSON_NAME_MAX_LENGTH: usize = 150;
pub const NAME_MAX_LENGTH: usize = 200;
pub const SLUG_MAX_LENGTH: usize = 200;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_AMOUNT: i32 = 1;

/// Base64 encoded images travel inside JSON bodies
pub const MAX_BODY_SIZE: u64 = 8 * 1024 * 1024;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
