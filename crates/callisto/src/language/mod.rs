/*
 * mod.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

pub mod cancellation;
pub mod execution_context;
pub mod interpreter;
