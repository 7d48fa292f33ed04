pub mod dynamodb {
    pub const PK_FIELD: &str = "PK";
    pub const SK_FIELD: &str = "SK";

    pub const TICKET_PREFIX: &str = "Ticket#";
    pub const TICKET_SK: &str = "Metadata";
    pub const USER_PREFIX: &str = "User#";
    pub const DEVICE_PREFIX: &str = "Device#";

    pub const TICKET_ID_FIELD: &str = "TicketId";
    pub const CATEGORY_FIELD: &str = "CategoryName";
    pub const PROBLEM_TYPE_FIELD: &str = "ProblemTypeName";
    pub const LOCATION_FIELD: &str = "Location";
    pub const SAFETY_FIELD: &str = "IsSafetyRelated";
    pub const STATUS_FIELD: &str = "Status";

    pub const USER_ID_FIELD: &str = "UserId";
    pub const ROLE_FIELD: &str = "Role";

    pub const PUSH_TOKEN_FIELD: &str = "PushToken";
    pub const PLATFORM_FIELD: &str = "Platform";
    pub const CREATED_AT_FIELD: &str = "CreatedAt";
    pub const UPDATED_AT_FIELD: &str = "UpdatedAt";
}

pub mod fcm {
    pub const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
    pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
    pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
    pub const DEFAULT_BASE_URL: &str = "https://fcm.googleapis.com";

    pub const DATA_TICKET_ID: &str = "ticketId";
    pub const DATA_TYPE: &str = "type";
    pub const DATA_CATEGORY: &str = "category";
    pub const DATA_PROBLEM_TYPE: &str = "problemType";
    pub const DATA_LOCATION: &str = "location";
    pub const DATA_STATUS: &str = "status";
}
