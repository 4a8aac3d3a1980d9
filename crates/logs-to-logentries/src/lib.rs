// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod digest;
pub mod error;
pub mod forwarder;
pub mod http_utils;
pub mod log_entry;
pub mod logger;
pub mod notifier;
pub mod processor;
pub mod server;
pub mod trigger;
pub mod uploader;
