//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jobwatch_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const BUSY: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_ERROR: i32 = 5001;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Busy(_) => code::BUSY,
        AppError::Codec(_) | AppError::Persist(_) => code::STORE_ERROR,
        AppError::Notify(_) => code::SYSTEM_ERROR,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };

    // Plain messages go out as-is; wrapped errors keep their category prefix
    let message = match err {
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Busy(msg)
        | AppError::Internal(msg) => msg,
        other => other.to_string(),
    };

    ErrorObjectOwned::owned(code, message, None::<()>)
}
