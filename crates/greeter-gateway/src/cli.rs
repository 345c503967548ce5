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

//! Command line and environment configuration of the gateway binary

use clap::{Parser, ValueEnum};
use greeter_gateway::GatewayConfig;
use std::env;
use std::time::Duration;
use tonic::codec::CompressionEncoding;

/// Payload compression between the gateway and the RPC server
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    None,
}

impl Compression {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" => Some(Compression::Gzip),
            "none" | "off" | "" => Some(Compression::None),
            _ => None,
        }
    }

    fn encoding(self) -> Option<CompressionEncoding> {
        match self {
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::None => None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "greeter-gateway", about = "HTTP/JSON gateway for helloworld.Greeter")]
pub struct Cli {
    /// Address to serve HTTP on (overrides $GREETER_GATEWAY_BIND_ADDRESS)
    #[arg(long)]
    pub bind: Option<String>,

    /// Default call deadline in milliseconds, 0 for none (overrides $GREETER_GATEWAY_TIMEOUT_MS)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Compression on the RPC path (overrides $GREETER_GATEWAY_COMPRESSION)
    #[arg(long, value_enum)]
    pub compression: Option<Compression>,
}

/// Configuration for the gateway binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Default deadline for downstream calls in milliseconds, 0 disables it
    pub timeout_ms: u64,

    pub compression: Compression,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            timeout_ms: 30_000,
            compression: Compression::Gzip,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_address: env::var("GREETER_GATEWAY_BIND_ADDRESS").unwrap_or(defaults.bind_address),

            timeout_ms: env::var("GREETER_GATEWAY_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.timeout_ms),

            compression: env::var("GREETER_GATEWAY_COMPRESSION").ok().and_then(|v| Compression::parse(&v)).unwrap_or(defaults.compression),
        }
    }

    /// Apply command line overrides
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(bind) = &cli.bind {
            self.bind_address = bind.clone();
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(compression) = cli.compression {
            self.compression = compression;
        }
        self
    }

    pub fn compression_encoding(&self) -> Option<CompressionEncoding> {
        self.compression.encoding()
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            default_timeout: (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms)),
            compression: self.compression_encoding(),
            ..GatewayConfig::default()
        }
    }
}
