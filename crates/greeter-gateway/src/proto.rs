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

//! `helloworld` package: wire messages and the generated `Greeter` stubs
//!
//! The messages carry both their protobuf encoding and their JSON mapping.
//! JSON names follow the protobuf JSON convention (lowerCamelCase), unknown
//! JSON fields are rejected and absent or `null` fields take their protobuf
//! default.

use serde::{Deserialize, Deserializer, Serialize};

include!(concat!(env!("OUT_DIR"), "/helloworld.Greeter.rs"));

/// Full RPC path of `Greeter.SayHello`
pub const SAY_HELLO_PATH: &str = "/helloworld.Greeter/SayHello";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HelloRequest {
    #[prost(string, tag = "1")]
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HelloReply {
    #[prost(string, tag = "1")]
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}
