//! 错误类型转换实现

use super::ServerError;
use std::io;

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        ServerError::startup(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_io_error_is_startup_failure() {
        let err: ServerError = io::Error::from(io::ErrorKind::AddrInUse).into();
        assert!(err.is_startup_io());
        assert_eq!(err.code(), ErrorCode::AddressInUse);
    }
}
