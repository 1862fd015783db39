//
// lib.rs
//
// Copyright (C) 2022 Posit Software, PBC. All rights reserved.
//
//

pub mod result;
pub mod spawn;
pub mod unwrap;

pub use crate::result::ResultExt;

/// Panics in debug builds and logs an error in release builds.
#[macro_export]
macro_rules! debug_panic {
    ($($rest:expr),*) => {{
        if cfg!(debug_assertions) {
            panic!($($rest, )*);
        } else {
            log::error!($($rest, )*);
        }
    }};
}
