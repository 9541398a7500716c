//! Wire protocol types (spec §6): the `GatewayRequest` shape accepted by
//! both gateways and the `Envelope<T>`/`ErrorBody` response pair every
//! call returns, plus the line-delimited JSON codec `cleo-mcp` speaks over
//! stdio.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod envelope;
mod line_codec;
mod request;

pub use envelope::{BatchData, BatchFailure, Envelope, EnvelopeMeta, ErrorBody};
pub use line_codec::{parse_line, read_request_line, write_response_line};
pub use request::{GatewayKind, GatewayRequest, DOMAINS, MUTATE_OPERATION_VERBS, QUERY_OPERATION_VERBS};

/// Fixed spec version stamped into every envelope (spec §4.7).
pub const SPEC_VERSION: &str = "1.1.0";

/// Fixed schema version stamped into every envelope (spec §4.7).
pub const SCHEMA_VERSION: u32 = 1;
