/// Error code for an empty request body
pub const ERROR_CODE_EMPTY_REQUEST_BODY: &str = "Key_EmptyRequestBody";

/// Error code for an internal error
pub const ERROR_CODE_INTERNAL_ERROR: &str = "Key_InternalError";

/// Error code for invalid fields
pub const ERROR_CODE_INVALID_FIELDS: &str = "Key_InvalidFields";

/// Error code for a body that is not valid JSON
pub const ERROR_CODE_INVALID_JSON: &str = "Key_InvalidJSON";

/// Error code for a request coming from a disallowed origin
pub const ERROR_CODE_INVALID_REQUEST_ORIGIN: &str = "Key_InvalidRequestOrigin";

/// Error code for an invalid request payload
pub const ERROR_CODE_INVALID_REQUEST_PAYLOAD: &str = "Key_InvalidRequestPayload";

/// Error code for a field holding an invalid value
pub const ERROR_CODE_INVALID_VALUE: &str = "Key_InvalidValue";

/// Error code for a missing required field
pub const ERROR_CODE_REQUIRED: &str = "Key_Required";

/// Routing key published after a company is created
pub const ROUTING_KEY_COMPANY_CREATED: &str = "company.created";

/// Routing key published after a company is updated
pub const ROUTING_KEY_COMPANY_UPDATED: &str = "company.updated";

/// Routing key published after a company is deleted
pub const ROUTING_KEY_COMPANY_DELETED: &str = "company.deleted";
