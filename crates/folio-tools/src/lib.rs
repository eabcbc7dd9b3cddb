// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-tools: the tool catalog and the dispatcher that runs it.
//
// A caller names a tool by its kebab-case id, hands over input files and a
// loose options bag, and gets named output buffers back. Options are parsed
// into a typed `ToolRequest` before any document is touched.

pub mod catalog;
pub mod dispatcher;
pub(crate) mod handlers;
pub mod request;

pub use catalog::{Category, ToolId};
pub use dispatcher::Dispatcher;
pub use request::ToolRequest;
