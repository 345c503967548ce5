// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! HTTP/JSON to gRPC gateway
//!
//! Requests are matched against a static route table, their JSON bodies are
//! transcoded into protobuf wire bytes, and the bytes are sent over a tonic
//! channel as an opaque unary call. Replies travel the same way back.

pub mod codec;
pub mod deadline;
pub mod error_mapping;
pub mod metadata;
pub mod route;
pub mod transcoder;
pub mod translator;

pub use codec::WireCodec;
pub use error_mapping::ErrorMapper;
pub use route::{MethodBinding, RouteMatch, RouteTable};
pub use transcoder::{MessageTranscoder, ProstJsonTranscoder};
pub use translator::{Gateway, GatewayBuilder, GatewayMetrics};
