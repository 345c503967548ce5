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

use greeter_gateway::{Harness, HelloWorldGreeter};
use hyper::StatusCode;
use proptest::prelude::*;
use serde_json::{Value, json};

fn both_paths(name: &str) -> (StatusCode, Value, String) {
    let runtime = tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap();

    runtime.block_on(async {
        let harness = Harness::start(HelloWorldGreeter).await.unwrap();

        let response = harness.http_client().post_json("/v1/example/echo", &json!({"name": name})).await.unwrap();
        let native = harness.rpc_client().say_hello(name).await.unwrap();

        harness.shutdown().await;
        (response.status, response.json::<Value>().unwrap(), native.message)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_http_and_native_agree_for_any_name(name in "\\PC{0,32}") {
        let (status, over_http, native) = both_paths(&name);
        let expected = format!("{} world", name);

        prop_assert_eq!(status, StatusCode::OK);
        prop_assert_eq!(over_http, json!({"message": expected.clone()}));
        prop_assert_eq!(native, expected);
    }
}
