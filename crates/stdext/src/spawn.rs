//
// spawn.rs
//
// Copyright (C) 2022 Posit Software, PBC. All rights reserved.
//
//

/// Spawns a named thread.
///
/// Panics if the operating system refuses to create the thread, which is
/// only expected when resources are exhausted.
///
/// ```
/// let handle = stdext::spawn!("worker", || 40 + 2);
/// assert_eq!(handle.join().unwrap(), 42);
/// ```
#[macro_export]
macro_rules! spawn {
    ($name:expr, $body:expr) => {{
        let name: String = $name.into();
        match std::thread::Builder::new().name(name.clone()).spawn($body) {
            Ok(handle) => handle,
            Err(err) => panic!("Can't spawn thread '{name}': {err:?}"),
        }
    }};
}
