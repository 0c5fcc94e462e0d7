use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
};

use casper_types::{CLValue, U256, account::AccountHash, contracts::ContractHash};
use tracing_subscriber::fmt::MakeWriter;
use veles_casper_cep18_client::{
    EventsMode, KeyParameter, QueryError, StateQuery, StateReader, allowance_key, balance_key,
};

#[derive(Default)]
struct StubQuery {
    dictionaries: HashMap<(String, String), CLValue>,
    named_keys: HashMap<String, CLValue>,
    failing: bool,
}

impl StubQuery {
    fn with_item(mut self, dictionary: &str, item_key: String, value: CLValue) -> Self {
        self.dictionaries
            .insert((dictionary.to_string(), item_key), value);
        self
    }

    fn with_named_key(mut self, name: &str, value: CLValue) -> Self {
        self.named_keys.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("node unreachable")]
struct Unreachable;

impl StateQuery for StubQuery {
    async fn query_dictionary(
        &self,
        _contract_hash: ContractHash,
        dictionary_name: &str,
        item_key: &str,
    ) -> Result<CLValue, QueryError> {
        if self.failing {
            return Err(QueryError::Backend(Box::new(Unreachable)));
        }
        self.dictionaries
            .get(&(dictionary_name.to_string(), item_key.to_string()))
            .cloned()
            .ok_or_else(|| QueryError::ValueNotFound(format!("{dictionary_name}/{item_key}")))
    }

    async fn query_path(
        &self,
        _contract_hash: ContractHash,
        path: &[&str],
    ) -> Result<CLValue, QueryError> {
        let name = path.join("/");
        self.named_keys
            .get(&name)
            .cloned()
            .ok_or(QueryError::ValueNotFound(name))
    }
}

/// Collects formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

fn account(byte: u8) -> KeyParameter {
    KeyParameter::Account(AccountHash::new([byte; 32]))
}

fn reader(query: StubQuery) -> StateReader<StubQuery> {
    StateReader::new(query).with_contract_hash(ContractHash::new([0x42; 32]))
}

#[tokio::test]
async fn balance_of_reads_balances_dictionary() {
    let holder = account(1);
    let query = StubQuery::default().with_item(
        "balances",
        balance_key(&holder),
        CLValue::from_t(U256::from(50_000_000_000u64)).unwrap(),
    );
    let balance = reader(query).balance_of(&holder).await.unwrap();
    assert_eq!(balance, U256::from(50_000_000_000u64));
}

#[tokio::test]
async fn missing_balance_is_zero_with_one_warning() {
    let (logs, _guard) = capture_logs();
    let holder = account(2);

    let balance = reader(StubQuery::default())
        .balance_of(&holder)
        .await
        .unwrap();

    assert_eq!(balance, U256::zero());
    let output = logs.contents();
    assert_eq!(output.matches("WARN").count(), 1, "{output}");
    assert!(output.contains(&format!("Not found balance for {holder}")));
}

#[tokio::test]
async fn missing_allowance_is_zero_and_names_both_parties() {
    let (logs, _guard) = capture_logs();
    let owner = account(3);
    let spender = KeyParameter::Hash([4u8; 32]);

    let allowance = reader(StubQuery::default())
        .allowances(&owner, &spender)
        .await
        .unwrap();

    assert_eq!(allowance, U256::zero());
    let output = logs.contents();
    assert_eq!(output.matches("WARN").count(), 1, "{output}");
    assert!(output.contains(&owner.to_string()));
    assert!(output.contains(&spender.to_string()));
}

#[tokio::test]
async fn allowance_lookup_is_ordered() {
    let owner = account(5);
    let spender = account(6);
    let query = StubQuery::default().with_item(
        "allowances",
        allowance_key(&owner, &spender),
        CLValue::from_t(U256::from(20u8)).unwrap(),
    );
    let reader = reader(query);
    assert_eq!(
        reader.allowances(&owner, &spender).await.unwrap(),
        U256::from(20u8)
    );
    assert_eq!(
        reader.allowances(&spender, &owner).await.unwrap(),
        U256::zero()
    );
}

#[tokio::test]
async fn backend_errors_propagate() {
    let query = StubQuery {
        failing: true,
        ..Default::default()
    };
    let result = reader(query).balance_of(&account(1)).await;
    assert!(matches!(result, Err(QueryError::Backend(_))));
}

#[tokio::test]
async fn metadata_queries() {
    let query = StubQuery::default()
        .with_named_key("name", CLValue::from_t("TEST CEP18".to_string()).unwrap())
        .with_named_key("symbol", CLValue::from_t("TFT".to_string()).unwrap())
        .with_named_key("decimals", CLValue::from_t(9u8).unwrap())
        .with_named_key(
            "total_supply",
            CLValue::from_t(U256::from(1_000_000u64)).unwrap(),
        )
        .with_named_key("events_mode", CLValue::from_t(2u8).unwrap());
    let reader = reader(query);

    assert_eq!(reader.name().await.unwrap(), "TEST CEP18");
    assert_eq!(reader.symbol().await.unwrap(), "TFT");
    assert_eq!(reader.decimals().await.unwrap(), 9);
    assert_eq!(
        reader.total_supply().await.unwrap(),
        U256::from(1_000_000u64)
    );
    assert_eq!(reader.events_mode().await.unwrap(), EventsMode::CES);
}

#[tokio::test]
async fn events_mode_follows_contract_numbering() {
    for (stored, expected) in [
        (0u8, EventsMode::NoEvents),
        (1, EventsMode::CEP47),
        (2, EventsMode::CES),
    ] {
        let query =
            StubQuery::default().with_named_key("events_mode", CLValue::from_t(stored).unwrap());
        assert_eq!(reader(query).events_mode().await.unwrap(), expected);
    }
}

#[tokio::test]
async fn metadata_not_found_is_an_error() {
    let result = reader(StubQuery::default()).name().await;
    assert!(matches!(result, Err(QueryError::ValueNotFound(_))));
}

#[tokio::test]
async fn events_mode_rejects_unknown_number() {
    let query =
        StubQuery::default().with_named_key("events_mode", CLValue::from_t(U256::from(9u8)).unwrap());
    let result = reader(query).events_mode().await;
    assert!(matches!(result, Err(QueryError::EventsMode(_))));
}

#[tokio::test]
async fn mistyped_value_is_reported() {
    let query = StubQuery::default().with_named_key("decimals", CLValue::from_t(9u64).unwrap());
    let result = reader(query).decimals().await;
    assert!(matches!(result, Err(QueryError::UnexpectedValue { .. })));
}

#[tokio::test]
async fn queries_require_contract_hash() {
    let result = StateReader::new(StubQuery::default())
        .balance_of(&account(1))
        .await;
    assert!(matches!(result, Err(QueryError::MissingContractHash)));
}
