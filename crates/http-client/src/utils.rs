//! Internal helper macros.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Reads like `assert!` but fails the enclosing function instead of panicking:
///
/// ```ignore
/// ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
