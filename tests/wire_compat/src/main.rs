fn main() {
    println!("Run `cargo test -p wire-compat` to execute CDP wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use devtap_console_log::{EventAdapter, InlineResolver, LineFormatter, MessageNormalizer, OutputMode};
    use devtap_protocol::cdp;
    use devtap_protocol::{ConsoleMessage, ConsoleType, RawEvent};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON numbers so that `65` and `65.0` compare equal.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, number-normalized comparison).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  browser: {fixture}\n  devtap:  {reserialized}"
        );
    }

    /// Feeds a fixture through the adapter as the given CDP notification.
    fn adapt(adapter: &mut EventAdapter, method: &str, fixture: &str) -> Option<RawEvent> {
        adapter.adapt(method, &load_fixture(fixture))
    }

    // --- CDP payload round trips ---

    #[test]
    fn fixture_console_api_called() {
        roundtrip_test::<cdp::ConsoleApiCalledParams>("console_api_called.json");
    }

    #[test]
    fn fixture_log_entry_added() {
        roundtrip_test::<cdp::LogEntryAddedParams>("log_entry_added.json");
    }

    #[test]
    fn fixture_exception_thrown() {
        roundtrip_test::<cdp::ExceptionThrownParams>("exception_thrown.json");
    }

    #[test]
    fn fixture_request_will_be_sent() {
        roundtrip_test::<cdp::RequestWillBeSentParams>("request_will_be_sent.json");
    }

    #[test]
    fn fixture_loading_failed() {
        roundtrip_test::<cdp::LoadingFailedParams>("loading_failed.json");
    }

    #[test]
    fn fixture_console_message() {
        let msg: ConsoleMessage = serde_json::from_value(load_fixture("console_message.json")).unwrap();
        assert_eq!(msg.kind, ConsoleType::Warn);
        assert_eq!(msg.location.as_ref().unwrap().line_number, 10);
        assert_eq!(msg.args.len(), 1);

        let again: ConsoleMessage =
            serde_json::from_value(serde_json::to_value(&msg).unwrap()).unwrap();
        assert_eq!(again, msg);
    }

    // --- Fixtures through the pipeline stages ---

    #[test]
    fn console_api_called_line() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::ProtocolValue(event)) =
            adapt(&mut adapter, "Runtime.consoleAPICalled", "console_api_called.json")
        else {
            panic!("expected protocol-value event");
        };
        let msg = MessageNormalizer::new().normalize_protocol_value(event).unwrap();
        assert_eq!(
            LineFormatter::default().format(&msg),
            "[2023-11-14T22:13:20.123Z] [LOG] (main.ts:10:3) user {id: 7, name: \"ada\"} loaded in 42ms\n"
        );
    }

    #[tokio::test]
    async fn log_entry_added_line() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::Structured(event)) =
            adapt(&mut adapter, "Log.entryAdded", "log_entry_added.json")
        else {
            panic!("expected structured event");
        };
        let msg = MessageNormalizer::new()
            .normalize_structured(event, &InlineResolver)
            .await
            .unwrap();
        assert_eq!(
            LineFormatter::new(OutputMode::Structured, false, true).format(&msg),
            "[ERROR] (favicon.ico) Failed to load resource: the server responded with a status of 404 (Not Found)\n"
        );
    }

    #[test]
    fn exception_thrown_line() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::PageError(event)) =
            adapt(&mut adapter, "Runtime.exceptionThrown", "exception_thrown.json")
        else {
            panic!("expected page error");
        };
        let msg = MessageNormalizer::new().normalize_page_error(event);
        assert_eq!(
            LineFormatter::default().format(&msg),
            "[2023-11-14T22:13:21.000Z] [ERROR] (app.ts:42:13) Uncaught TypeError: Cannot read properties of undefined (reading 'x')\n\
             \x20   at render (http://localhost:5173/src/app.ts:42:13)\n\
             \x20   at http://localhost:5173/src/app.ts:61:2\n"
        );
    }

    #[test]
    fn loading_failed_line() {
        let mut adapter = EventAdapter::new();
        assert!(adapt(&mut adapter, "Network.requestWillBeSent", "request_will_be_sent.json").is_none());
        let Some(RawEvent::RequestFailed(event)) =
            adapt(&mut adapter, "Network.loadingFailed", "loading_failed.json")
        else {
            panic!("expected request failure");
        };
        let msg = MessageNormalizer::new().normalize_request_failed(event);
        assert_eq!(
            LineFormatter::new(OutputMode::Raw, true, true).format(&msg),
            "Failed to load POST http://localhost:3000/api/users: net::ERR_CONNECTION_REFUSED\n"
        );
    }

    #[test]
    fn json_line_parses_back() {
        let mut adapter = EventAdapter::new();
        let Some(RawEvent::ProtocolValue(event)) =
            adapt(&mut adapter, "Runtime.consoleAPICalled", "console_api_called.json")
        else {
            panic!("expected protocol-value event");
        };
        let msg = MessageNormalizer::new().normalize_protocol_value(event).unwrap();
        let line = LineFormatter::new(OutputMode::Json, true, true).format(&msg);
        let parsed: ConsoleMessage = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, msg);
    }
}
