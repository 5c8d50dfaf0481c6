// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Template-driven vulnerability checking: engine contract, the
//! CLI-backed default executor, tag-to-template filtering and the
//! bounded-concurrency driver.

pub mod driver;
pub mod engine;
pub mod executor;
pub mod template_filter;

pub use driver::{run_sequential, run_thread_safe, NucleiOption};
pub use engine::{EngineOptions, EngineProvider, ResultEvent, TemplateEngine};
pub use executor::NucleiCli;
pub use template_filter::{expand_yaml_files, filter_templates};
