//
// unwrap.rs
//
// Copyright (C) 2022 Posit Software, PBC. All rights reserved.
//
//

/// Unwraps a `Result` or an `Option`, evaluating the fallback arm otherwise.
/// The fallback typically logs and then `return`s or `continue`s.
///
/// ```
/// # use stdext::unwrap;
/// fn parse(x: &str) -> i32 {
///     let value = unwrap!(x.parse::<i32>(), Err(_err) => {
///         return -1;
///     });
///     value * 2
/// }
/// assert_eq!(parse("21"), 42);
/// assert_eq!(parse("foo"), -1);
/// ```
#[macro_export]
macro_rules! unwrap {
    ($value:expr, Err($err:pat) => $fail:expr) => {
        match $value {
            Ok(value) => value,
            Err($err) => $fail,
        }
    };

    ($value:expr, None => $fail:expr) => {
        match $value {
            Some(value) => value,
            None => $fail,
        }
    };
}
